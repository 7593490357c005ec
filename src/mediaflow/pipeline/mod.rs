pub mod barrier;
pub mod consumer_group;
pub mod listener;
pub mod publisher;
pub mod trigger;

pub use barrier::{
    BarrierOutcome, BarrierRegistry, BarrierState, CompletionBarrier, DEFAULT_BARRIER_TIMEOUT,
};
pub use consumer_group::{ConsumerGroup, ListenerId, ListenerStats};
pub use listener::{ListenerError, ListenerRegistry, MediaListener, MessageHandler, NoopListener};
pub use publisher::Publisher;
pub use trigger::{IngestInput, IngestReport, IngestionTrigger};
