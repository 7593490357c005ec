use clap::Parser;
use env_logger::Env;
use log::info;
use mediaflow::mediaflow::server::{SHUTDOWN_TIMEOUT, router};
use mediaflow::{
    AppConfig, BusKind, IngestError, KafkaAdminClient, KafkaClientError, KafkaProducer,
    KafkaSourceFactory, MediaService, MemoryBus, RecordSink, SecureSessionManager,
    ShutdownCoordinator, SourceFactory,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "mediaflow")]
#[command(about = "Media ingestion service - Kafka to Cassandra over pinned-CA TLS")]
#[command(version)]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bus implementation: kafka or memory
    #[arg(long)]
    bus: Option<BusKind>,

    #[arg(long)]
    brokers: Option<String>,

    #[arg(long)]
    topic: Option<String>,

    /// Listener tasks per topic
    #[arg(long)]
    concurrency: Option<usize>,

    #[arg(long)]
    cassandra_endpoint: Option<String>,

    #[arg(long)]
    cassandra_port: Option<u16>,

    #[arg(long)]
    datacenter: Option<String>,

    #[arg(long)]
    ca_cert: Option<PathBuf>,

    /// Require the store's certificate to name --cassandra-endpoint
    #[arg(long)]
    verify_hostname: bool,

    /// Delimited batch file; the embedded sample when omitted
    #[arg(long)]
    resource: Option<PathBuf>,

    #[arg(long)]
    barrier_timeout_secs: Option<u64>,

    /// HTTP listen address
    #[arg(long)]
    bind: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        if let Some(bus) = self.bus {
            config.kafka.bus = bus;
        }
        if let Some(brokers) = self.brokers {
            config.kafka.brokers = brokers;
        }
        if let Some(topic) = self.topic {
            config.kafka.topic = topic;
        }
        if let Some(concurrency) = self.concurrency {
            config.kafka.concurrency = concurrency;
        }
        if let Some(endpoint) = self.cassandra_endpoint {
            config.cassandra.endpoint = endpoint;
        }
        if let Some(port) = self.cassandra_port {
            config.cassandra.port = port;
        }
        if let Some(datacenter) = self.datacenter {
            config.cassandra.datacenter = datacenter;
        }
        if let Some(ca_cert) = self.ca_cert {
            config.cassandra.ca_cert_path = ca_cert;
        }
        if self.verify_hostname {
            config.cassandra.verify_hostname = true;
        }
        if let Some(resource) = self.resource {
            config.ingest.resource_path = Some(resource);
        }
        if let Some(secs) = self.barrier_timeout_secs {
            config.ingest.barrier_timeout_secs = secs;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), IngestError> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    info!("Starting mediaflow: {:?}", config);

    let sessions = Arc::new(SecureSessionManager::scylla(config.cassandra.clone()));
    let partitions = config.kafka.partitions;

    match config.kafka.bus {
        BusKind::Kafka => {
            let common = config.kafka.common_config();

            let admin = KafkaAdminClient::new(&common).map_err(KafkaClientError::from)?;
            for topic in [config.kafka.topic.clone(), config.kafka.probe_topic()] {
                admin
                    .ensure_topic(&topic, partitions, config.kafka.replication_factor)
                    .await?;
            }

            let producer =
                Arc::new(KafkaProducer::with_config(&common).map_err(KafkaClientError::from)?);
            let factory = KafkaSourceFactory::new(
                common,
                config.kafka.group_id.clone(),
                config.kafka.client_id_prefix.clone(),
            );
            serve(config, producer, &factory, sessions).await
        }
        BusKind::Memory => {
            let bus = Arc::new(MemoryBus::new());
            bus.create_topic(&config.kafka.topic, partitions as usize);
            bus.create_topic(&config.kafka.probe_topic(), partitions as usize);
            info!("Using the in-process bus; messages do not leave this process");
            serve(config, bus.clone(), bus.as_ref(), sessions).await
        }
    }
}

async fn serve(
    config: AppConfig,
    sink: Arc<dyn RecordSink>,
    factory: &dyn SourceFactory,
    sessions: Arc<SecureSessionManager>,
) -> Result<(), IngestError> {
    let bind = config.server.bind.clone();
    let service = MediaService::new(config, sink, sessions)?;
    let group = service.start_consumers(factory, ShutdownCoordinator::new())?;

    let signals = ShutdownCoordinator::new();
    let stopped = signals.signalled();
    tokio::spawn({
        let signals = signals.clone();
        async move { signals.wait_for_signal().await }
    });

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("HTTP trigger listening on {} (GET /media)", bind);

    axum::serve(listener, router(service.trigger()))
        .with_graceful_shutdown(stopped)
        .await?;

    info!("HTTP server stopped, shutting down pipeline");
    group.shutdown().await;
    service.shutdown(SHUTDOWN_TIMEOUT).await;
    info!("mediaflow stopped");
    Ok(())
}
