use super::record::MediaRecord;
use std::io::Read;

/// The sample batch bundled with the service
pub const EMBEDDED_MEDIA_CSV: &str = include_str!("../../../resources/media_by_title_year.csv");

pub const DEFAULT_DELIMITER: u8 = b'$';

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: expected {expected} columns, found {found}")]
    MissingColumns {
        line: u64,
        found: usize,
        expected: usize,
    },

    #[error("line {line}: unreadable row: {source}")]
    Malformed {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to open input '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ParseError {
    /// 1-based input line of the failing row, when known
    pub fn line(&self) -> Option<u64> {
        match self {
            ParseError::MissingColumns { line, .. } | ParseError::Malformed { line, .. } => {
                Some(*line)
            }
            ParseError::Open { .. } => None,
        }
    }
}

/// Reads delimited rows positionally into [`MediaRecord`]s
///
/// Columns are title, added_year, added_date, description, userid, videoid.
/// There is no header row. Fields may be quoted to contain the delimiter,
/// blank lines are skipped and columns past the sixth are ignored.
#[derive(Debug, Clone, Copy)]
pub struct RecordSource {
    delimiter: u8,
}

impl Default for RecordSource {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl RecordSource {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Lazily parses `reader`; iteration stops after the first error
    pub fn records<R: Read>(&self, reader: R) -> MediaRecords<R> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        MediaRecords {
            rows: reader.into_records(),
            failed: false,
        }
    }

    /// Parses the whole input, failing on the first malformed row
    pub fn parse<R: Read>(&self, reader: R) -> Result<Vec<MediaRecord>, ParseError> {
        self.records(reader).collect()
    }
}

/// Iterator returned by [`RecordSource::records`]
pub struct MediaRecords<R> {
    rows: csv::StringRecordsIntoIter<R>,
    failed: bool,
}

impl<R: Read> Iterator for MediaRecords<R> {
    type Item = Result<MediaRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let result = match self.rows.next()? {
            Ok(row) => to_record(&row),
            Err(source) => Err(ParseError::Malformed {
                line: source.position().map(|p| p.line()).unwrap_or(0),
                source,
            }),
        };

        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

fn to_record(row: &csv::StringRecord) -> Result<MediaRecord, ParseError> {
    if row.len() < MediaRecord::FIELD_COUNT {
        return Err(ParseError::MissingColumns {
            line: row.position().map(|p| p.line()).unwrap_or(0),
            found: row.len(),
            expected: MediaRecord::FIELD_COUNT,
        });
    }

    Ok(MediaRecord::new(
        &row[0], &row[1], &row[2], &row[3], &row[4], &row[5],
    ))
}
