use serde::{Deserialize, Serialize};
use std::fmt;

/// One media entry as read from the batch input
///
/// Every field is kept as the text that appeared in the input; conversion to
/// column types happens only when the row is written. All six fields are
/// required, so a JSON payload missing any of them fails to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub title: String,
    pub added_year: String,
    pub added_date: String,
    pub description: String,
    pub userid: String,
    pub videoid: String,
}

impl MediaRecord {
    /// Logical type carried in the `__TypeId__` header
    pub const TYPE_ID: &'static str = "MediaRecord";

    /// Column order of the delimited input
    pub const FIELD_COUNT: usize = 6;

    pub fn new(
        title: impl Into<String>,
        added_year: impl Into<String>,
        added_date: impl Into<String>,
        description: impl Into<String>,
        userid: impl Into<String>,
        videoid: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            added_year: added_year.into(),
            added_date: added_date.into(),
            description: description.into(),
            userid: userid.into(),
            videoid: videoid.into(),
        }
    }
}

impl fmt::Display for MediaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Video [title={}, added_year={}, added_date={}, description={}, userid={}, videoid={}]",
            self.title, self.added_year, self.added_date, self.description, self.userid, self.videoid
        )
    }
}
