use crate::mediaflow::error::IngestError;
use crate::mediaflow::pipeline::IngestionTrigger;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Router};
use std::sync::Arc;

pub const CONFIRMATION: &str = "Thanks for sending us your favorite media!";

/// `GET /media` runs one ingestion; `GET /health` answers `ok`
pub fn router(trigger: Arc<IngestionTrigger>) -> Router {
    Router::new()
        .route("/media", get(handle_ingest))
        .route("/health", get(handle_health))
        .layer(Extension(trigger))
}

/// Replies with the confirmation once the run's wait ends, including when it expired
pub async fn handle_ingest(
    Extension(trigger): Extension<Arc<IngestionTrigger>>,
) -> (StatusCode, String) {
    match trigger.run().await {
        Ok(report) => {
            log::debug!(
                "Trigger finished: batch {} dispatched {} ({:?})",
                report.batch_id,
                report.dispatched,
                report.outcome
            );
            (StatusCode::OK, CONFIRMATION.to_string())
        }
        Err(IngestError::Connection(e)) => {
            log::error!("Ingestion aborted, store unavailable: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Storage unavailable: {}", e),
            )
        }
        Err(IngestError::Parse(e)) => {
            log::error!("Ingestion stopped on malformed input: {}", e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Malformed input: {}", e),
            )
        }
        Err(e) => {
            log::error!("Ingestion failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Ingestion failed: {}", e),
            )
        }
    }
}

pub async fn handle_health() -> &'static str {
    "ok"
}
