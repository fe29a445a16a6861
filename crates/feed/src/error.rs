use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum FeedError {
    /// File could not be opened or read.
    Io { path: PathBuf, message: String },
    /// File is not valid UTF-8.
    Encoding { path: PathBuf },
    /// File has no header row (empty, or only blank lines).
    NoHeader { path: PathBuf },
    /// Headers match neither known report shape.
    UnknownReport { headers: Vec<String> },
    /// A record failed a precondition (e.g. blank item number).
    Validation(String),
    /// Unknown user-editable field name.
    UnknownField { entity: &'static str, field: String },
    /// CSV reader error outside of a single data row.
    Csv(String),
    /// SQLite error.
    Sqlite(rusqlite::Error),
    /// JSON (de)serialization error for meta or mapping blobs.
    Json(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Encoding { path } => write!(f, "{} is not valid UTF-8", path.display()),
            Self::NoHeader { path } => write!(f, "{} has no header row", path.display()),
            Self::UnknownReport { headers } => {
                write!(f, "unrecognized report layout (headers: {})", headers.join(", "))
            }
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::UnknownField { entity, field } => {
                write!(f, "'{field}' is not a user-editable field of {entity}")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Sqlite(e) => write!(f, "database error: {e}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for FeedError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e)
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}

impl From<csv::Error> for FeedError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
