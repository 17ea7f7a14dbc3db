use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network timeout")]
    Timeout,

    #[error("{endpoint} answered with HTTP {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Login accepted but no JSESSIONID cookie was set")]
    MissingSessionCookie,

    #[error("Malformed calendar: {0}")]
    Calendar(#[from] CalendarError),

    #[error("Invalid saved view value for '{key}': {value:?}")]
    SavedView { key: String, value: String },

    #[error("Cannot pick an event from an empty sequence")]
    EmptyInput,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Reasons a calendar export could not be turned into lessons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("no BEGIN:VEVENT line found")]
    MissingEventBlock,

    #[error("END:VEVENT without an open event on line {line}")]
    UnmatchedEnd { line: usize },

    #[error("property without ':' separator on line {line}")]
    MissingValue { line: usize },

    #[error("invalid date-time {value:?}: {reason}")]
    InvalidDateTime { value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
