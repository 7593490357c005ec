pub mod error;
pub mod session;
pub mod tls;
pub mod writer;

pub use error::{ConnectionError, WriteError};
pub use session::{CqlExecutor, ScyllaConnector, SecureSessionManager, SessionConnector};
pub use tls::{PinnedCaVerifier, build_tls_context, load_ca_store};
pub use writer::{INSERT_CQL, KEYSPACE, StorageWriter, TABLE, VideoRow};
