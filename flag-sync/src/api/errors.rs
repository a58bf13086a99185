use thiserror::Error;

use crate::{adapters::RemoteError, store::StoreError};

/// What went wrong, independent of how many layers of context were added on the way up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    RemoteFetch,
    Store,
    UpdateConflict,
    Cancelled,
    Timeout,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("{entity} {key} already exists")]
    AlreadyExists { entity: &'static str, key: String },
    #[error(transparent)]
    RemoteFetch(#[from] RemoteError),
    #[error(transparent)]
    Store(StoreError),
    #[error("Project not updated")]
    UpdateConflict,
    #[error("operation cancelled")]
    Cancelled,
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
    // The cause is rendered inline, so it is not exposed as `source()` as well.
    #[error("{message}: {cause}")]
    Context {
        message: String,
        cause: Box<SyncError>,
    },
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, key } => SyncError::NotFound { entity, key },
            StoreError::AlreadyExists { entity, key } => SyncError::AlreadyExists { entity, key },
            other => SyncError::Store(other),
        }
    }
}

impl SyncError {
    pub fn project_not_found(key: &str) -> Self {
        SyncError::NotFound {
            entity: "project",
            key: key.to_string(),
        }
    }

    /// Wraps the error with a message naming the failed operation. The kind is preserved.
    pub fn context(self, message: impl Into<String>) -> Self {
        SyncError::Context {
            message: message.into(),
            cause: Box::new(self),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::NotFound { .. } => ErrorKind::NotFound,
            SyncError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            SyncError::RemoteFetch(_) => ErrorKind::RemoteFetch,
            SyncError::Store(_) => ErrorKind::Store,
            SyncError::UpdateConflict => ErrorKind::UpdateConflict,
            SyncError::Cancelled => ErrorKind::Cancelled,
            SyncError::Timeout(_) => ErrorKind::Timeout,
            SyncError::Context { cause, .. } => cause.kind(),
        }
    }

    /// Returns a short error code for logging and for the request layer's response mapping.
    pub fn error_code(&self) -> &'static str {
        match self.kind() {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AlreadyExists => "conflict",
            ErrorKind::RemoteFetch => "remote_fetch_error",
            ErrorKind::Store => "store_error",
            ErrorKind::UpdateConflict => "update_conflict",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Timeout => "timeout",
        }
    }

    /// Conflicts lose a race with a concurrent writer; the caller may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::UpdateConflict | ErrorKind::Timeout)
    }
}

/// Adds operation context to the error side of a result.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, message: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T, SyncError> {
    fn with_context<F, S>(self, message: F) -> Result<T, SyncError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(message()))
    }
}
