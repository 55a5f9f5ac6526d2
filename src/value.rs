use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a feed, the scope of every lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeedId(pub u32);

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "feed#{}", self.0)
    }
}

/// Technical identifier of a record inside a [crate::RecordStore]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A typed field value
///
/// Scalars without a dedicated kind stay [Value::Text]; the storage layer does the final coercion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Value {
    /// No value
    Null,
    /// Unconverted or string-like value
    Text(String),
    /// Boolean flag
    Bool(bool),
    /// Calendar day
    Date(NaiveDate),
    /// Reference to a related record
    Ref(RecordId),
    /// The feed owning the record
    Feed(FeedId),
}

impl Value {
    /// Builds a [Value::Text]
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Is this [Value::Null]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The referenced record, if any
    pub fn as_ref_id(&self) -> Option<RecordId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }

    /// The text, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

/// Parses a `YYYYMMDD` date. Exactly 8 ascii digits are accepted
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{s}' is not a valid date; YYYYMMDD format is expected"));
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|e| format!("'{s}' is not a valid date: {e}"))
}

/// Writes a date as `YYYYMMDD`
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[test]
fn test_parse_date() {
    assert_eq!(
        Ok(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()),
        parse_date("20240309")
    );
    assert!(parse_date("2024039").is_err());
    assert!(parse_date("2024-03-09").is_err());
    assert!(parse_date("20240230").is_err());
    assert!(parse_date("").is_err());
    assert_eq!(
        "20240309",
        format_date(&NaiveDate::from_ymd_opt(2024, 3, 9).unwrap())
    );
}
