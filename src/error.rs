use std::num::ParseIntError;

use thiserror::Error;

/// A single source row could not be turned into a `RegionReport`.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("column `{field}` is missing from the source row")]
    MissingField { field: &'static str },
    #[error("column `{field}` is not a base-10 integer: `{value}`")]
    InvalidInteger {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl ParseError {
    /// Name of the source column that failed.
    pub fn field(&self) -> &'static str {
        match self {
            ParseError::MissingField { field } => *field,
            ParseError::InvalidInteger { field, .. } => *field,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to retrieve {url}: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered {status} {status_text}")]
    Status {
        url: String,
        status: u16,
        status_text: String,
    },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("daily report is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("daily report row {row} rejected: {source}")]
    Parse {
        row: usize,
        #[source]
        source: ParseError,
    },
}

#[derive(Error, Debug)]
pub enum AnnounceError {
    #[error("failed to reach ledger node at {url}: {message}")]
    Transport { url: String, message: String },
    #[error("ledger node rejected the report with {status} {status_text}: {body}")]
    Rejected {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to read ledger acknowledgement: {0}")]
    Acknowledgement(#[source] std::io::Error),
}

/// Anything that ends a single scheduled run early.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Announce(#[from] AnnounceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path} as TOML: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid trigger time `{0}`, expected HH:MM")]
    Trigger(String),
    #[error("unknown network `{0}`, expected `test` or `main`")]
    Network(String),
    #[error("private key must be 64 hexadecimal characters")]
    PrivateKey,
    #[error("invalid report date `{0}`, expected MM-DD-YYYY")]
    Date(String),
    #[error("failed to prompt for private key: {0}")]
    Prompt(#[source] std::io::Error),
}
