pub mod http;
pub mod shutdown;

pub use http::{CONFIRMATION, router};
pub use shutdown::{SHUTDOWN_TIMEOUT, ShutdownCoordinator, ShutdownSignal, shutdown_signal};
