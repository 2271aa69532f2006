use thiserror::Error;

/// Failures reported by a [`RecordStore`](crate::store::RecordStore).
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("Invalid store endpoint: {0}")]
    Endpoint(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Store responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),

    #[error("Subscription rejected: {0}")]
    Subscribe(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Store connection closed")]
    Closed,
}

/// Failures reported by a [`FileUrlResolver`](crate::files::FileUrlResolver).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Record is missing field '{0}'")]
    MissingField(&'static str),

    #[error("File name is empty")]
    EmptyFileName,

    #[error("Invalid file URL: {0}")]
    InvalidUrl(String),
}
