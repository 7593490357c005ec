pub mod record;
pub mod source;

pub use record::MediaRecord;
pub use source::{DEFAULT_DELIMITER, EMBEDDED_MEDIA_CSV, MediaRecords, ParseError, RecordSource};
