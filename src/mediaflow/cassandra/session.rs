use super::error::{ConnectionError, WriteError};
use super::tls::build_tls_context;
use super::writer::{KEYSPACE, VideoRow};
use crate::mediaflow::config::CassandraConfig;
use async_trait::async_trait;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::policies::load_balancing::DefaultPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// An established, keyspace-bound session shared by every writer
///
/// Implementations must allow concurrent `execute` calls on a shared
/// reference; writers never lock around them. Connections are released when
/// the last handle is dropped, so a write already holding one finishes first.
#[async_trait]
pub trait CqlExecutor: Send + Sync {
    async fn execute(&self, statement: &str, row: &VideoRow) -> Result<(), WriteError>;

    /// Called once when the owning manager lets go of the session
    async fn shutdown(&self) {}
}

/// Opens sessions given a ready TLS context
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn connect(
        &self,
        config: &CassandraConfig,
        tls: Arc<rustls::ClientConfig>,
    ) -> Result<Arc<dyn CqlExecutor>, ConnectionError>;
}

/// Connects with the scylla driver (CQL protocol, works against Cassandra)
#[derive(Debug, Default, Clone, Copy)]
pub struct ScyllaConnector;

#[async_trait]
impl SessionConnector for ScyllaConnector {
    async fn connect(
        &self,
        config: &CassandraConfig,
        tls: Arc<rustls::ClientConfig>,
    ) -> Result<Arc<dyn CqlExecutor>, ConnectionError> {
        let endpoint = format!("{}:{}", config.endpoint, config.port);

        let profile = ExecutionProfile::builder()
            .load_balancing_policy(
                DefaultPolicy::builder()
                    .prefer_datacenter(config.datacenter.clone())
                    .build(),
            )
            .build();

        let session: Session = SessionBuilder::new()
            .known_node(&endpoint)
            .user(&config.username, &config.password)
            .use_keyspace(KEYSPACE, false)
            .tls_context(Some(tls))
            .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
            .default_execution_profile_handle(profile.into_handle())
            .build()
            .await
            .map_err(|e| ConnectionError::Session {
                endpoint: endpoint.clone(),
                source: Box::new(e),
            })?;

        Ok(Arc::new(ScyllaExecutor { session }))
    }
}

/// The scylla session has no explicit close; its connection pool shuts down on drop.
struct ScyllaExecutor {
    session: Session,
}

#[async_trait]
impl CqlExecutor for ScyllaExecutor {
    async fn execute(&self, statement: &str, row: &VideoRow) -> Result<(), WriteError> {
        self.session
            .query_unpaged(statement, row.values())
            .await
            .map(|_| ())
            .map_err(|e| WriteError::Execution(Box::new(e)))
    }
}

/// Owns the one shared store session
///
/// Writers borrow the session through [`session`](Self::session); they never
/// open or close it. The session is opened on the first trigger and reused
/// by later ones until [`close`](Self::close).
pub struct SecureSessionManager {
    config: CassandraConfig,
    connector: Arc<dyn SessionConnector>,
    session: RwLock<Option<Arc<dyn CqlExecutor>>>,
    open_lock: Mutex<()>,
}

impl SecureSessionManager {
    pub fn new(config: CassandraConfig, connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            config,
            connector,
            session: RwLock::new(None),
            open_lock: Mutex::new(()),
        }
    }

    pub fn scylla(config: CassandraConfig) -> Self {
        Self::new(config, Arc::new(ScyllaConnector))
    }

    pub fn config(&self) -> &CassandraConfig {
        &self.config
    }

    /// Establishes a new authenticated, keyspace-bound session
    ///
    /// Fails before any network I/O when the pinned CA (or the client
    /// certificate) cannot be loaded. A previously open session is replaced.
    pub async fn open(&self) -> Result<Arc<dyn CqlExecutor>, ConnectionError> {
        let _guard = self.open_lock.lock().await;
        self.open_locked().await
    }

    /// Returns the open session, establishing it first if needed
    pub async fn ensure_open(&self) -> Result<Arc<dyn CqlExecutor>, ConnectionError> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(Arc::clone(session));
        }

        let _guard = self.open_lock.lock().await;
        // Another trigger may have finished opening while we waited.
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(Arc::clone(session));
        }
        self.open_locked().await
    }

    async fn open_locked(&self) -> Result<Arc<dyn CqlExecutor>, ConnectionError> {
        log::info!(
            "Opening secure session to {}:{} (datacenter '{}', keyspace {})",
            self.config.endpoint,
            self.config.port,
            self.config.datacenter,
            KEYSPACE
        );

        let tls = build_tls_context(&self.config).inspect_err(|e| {
            log::error!("Failed to build TLS context: {}", e);
        })?;

        let session = self
            .connector
            .connect(&self.config, tls)
            .await
            .inspect_err(|e| log::error!("Failed to open secure session: {}", e))?;

        let previous = self.session.write().await.replace(Arc::clone(&session));
        if let Some(previous) = previous {
            log::warn!("Replacing an already open session");
            previous.shutdown().await;
        }

        log::info!("Secure session established");
        Ok(session)
    }

    /// The established session, for writers
    pub async fn session(&self) -> Result<Arc<dyn CqlExecutor>, ConnectionError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or(ConnectionError::NotEstablished)
    }

    pub async fn is_open(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Stops handing out the session; returns `false` if there was none
    ///
    /// Writers that already hold a handle keep it until their statement
    /// completes; the connections close when the last handle is dropped.
    pub async fn close(&self) -> bool {
        let session = self.session.write().await.take();
        match session {
            Some(session) => {
                session.shutdown().await;
                let holders = Arc::strong_count(&session) - 1;
                if holders > 0 {
                    log::info!(
                        "Secure session released; closes after {} in-flight handle(s) drop",
                        holders
                    );
                } else {
                    log::info!("Secure session closed");
                }
                true
            }
            None => {
                log::debug!("Close requested but no session is open");
                false
            }
        }
    }
}
