use crate::mediaflow::kafka::kafka_error::PublishError;
use crate::mediaflow::kafka::utils::convert_kafka_log_level;
use log::{debug, error};
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::error::KafkaError;
use rdkafka::message::DeliveryResult;
use rdkafka::producer::ProducerContext;
use rdkafka::{ClientContext, Message};
use tokio::sync::oneshot;

/// Where a message ended up once the broker acknowledged it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

pub type DeliveryResultSender = oneshot::Sender<Result<DeliveryReport, PublishError>>;

/// Acknowledgment handle returned by a send
///
/// Publishing never waits for the broker. Callers that do care about the
/// acknowledgment can await [`DeliveryHandle::wait`]; dropping the handle is
/// the normal fire-and-forget path and does not cancel the send.
#[derive(Debug)]
pub struct DeliveryHandle {
    topic: String,
    receiver: oneshot::Receiver<Result<DeliveryReport, PublishError>>,
}

impl DeliveryHandle {
    /// A handle completed later through the returned sender
    pub fn pending(topic: impl Into<String>) -> (DeliveryResultSender, Self) {
        let (sender, receiver) = oneshot::channel();
        (
            sender,
            Self {
                topic: topic.into(),
                receiver,
            },
        )
    }

    /// A handle that is already resolved (in-process buses acknowledge on enqueue)
    pub fn completed(report: DeliveryReport) -> Self {
        let (sender, handle) = Self::pending(report.topic.clone());
        let _ = sender.send(Ok(report));
        handle
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Waits for the broker acknowledgment
    pub async fn wait(self) -> Result<DeliveryReport, PublishError> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(PublishError::Cancelled { topic: self.topic }),
        }
    }
}

/// Producer context that forwards librdkafka logs to `log` and resolves delivery handles
#[derive(Debug, Default)]
pub struct LoggingProducerContext;

impl ClientContext for LoggingProducerContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, message: &str) {
        log::log!(
            target: "mediaflow::publisher",
            convert_kafka_log_level(level),
            "Kafka log ({}): {}",
            fac,
            message
        );
    }

    fn error(&self, error: KafkaError, reason: &str) {
        error!(target: "mediaflow::publisher", "Kafka client error: {:?}, reason: {}", error, reason);
    }
}

impl ProducerContext for LoggingProducerContext {
    type DeliveryOpaque = Box<DeliveryResultSender>;

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, sender: Self::DeliveryOpaque) {
        let outcome = match delivery_result {
            Ok(message) => {
                debug!(
                    target: "mediaflow::publisher",
                    topic = message.topic(),
                    partition = message.partition(),
                    offset = message.offset();
                    "Message delivered"
                );
                Ok(DeliveryReport {
                    topic: message.topic().to_string(),
                    partition: message.partition(),
                    offset: message.offset(),
                })
            }
            Err((err, message)) => {
                // Nobody awaits most handles, so this log line is the only trace of the failure.
                error!(
                    target: "mediaflow::publisher",
                    "Delivery to topic '{}' failed: {}",
                    message.topic(),
                    err
                );
                Err(PublishError::Delivery {
                    topic: message.topic().to_string(),
                    reason: err.to_string(),
                })
            }
        };

        let _ = sender.send(outcome);
    }
}
