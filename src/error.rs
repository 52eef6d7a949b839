//! Error taxonomy for the sync layer and the tagged read result

use crate::adapters::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The remote call itself failed
    Gateway,
    /// The call succeeded but the payload had the wrong shape
    Shape,
    /// A required local value was missing before any call was made
    Precondition,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{command} failed: {source}")]
    Gateway {
        command: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error("unexpected response from {command}: {message}")]
    Shape {
        command: &'static str,
        message: String,
    },

    #[error("no account is signed in")]
    MissingAccount,

    #[error("project has no id")]
    MissingProjectId,

    #[error("project {id} not found")]
    NotFound { id: String },

    #[error("invalid annotation at index {index}: {message}")]
    InvalidAnnotation { index: usize, message: String },
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Gateway { .. } => ErrorKind::Gateway,
            SyncError::Shape { .. } => ErrorKind::Shape,
            SyncError::MissingAccount
            | SyncError::MissingProjectId
            | SyncError::NotFound { .. }
            | SyncError::InvalidAnnotation { .. } => ErrorKind::Precondition,
        }
    }

    pub(crate) fn shape(command: &'static str, message: impl Into<String>) -> Self {
        SyncError::Shape {
            command,
            message: message.into(),
        }
    }
}

/// Result of a read. `Empty` is a successful answer with nothing in it and
/// never stands in for a failure.
#[derive(Debug)]
pub enum FetchOutcome<T> {
    Data(T),
    Empty,
    Failed(SyncError),
}

impl<T> FetchOutcome<Vec<T>> {
    pub fn from_items(result: Result<Vec<T>, SyncError>) -> Self {
        match result {
            Ok(items) if items.is_empty() => FetchOutcome::Empty,
            Ok(items) => FetchOutcome::Data(items),
            Err(e) => FetchOutcome::Failed(e),
        }
    }
}

impl<T> FetchOutcome<T> {
    pub fn from_option(result: Result<Option<T>, SyncError>) -> Self {
        match result {
            Ok(Some(value)) => FetchOutcome::Data(value),
            Ok(None) => FetchOutcome::Empty,
            Err(e) => FetchOutcome::Failed(e),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FetchOutcome::Empty)
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            FetchOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn data(self) -> Option<T> {
        match self {
            FetchOutcome::Data(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_result(self) -> Result<Option<T>, SyncError> {
        match self {
            FetchOutcome::Data(value) => Ok(Some(value)),
            FetchOutcome::Empty => Ok(None),
            FetchOutcome::Failed(e) => Err(e),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchOutcome<U> {
        match self {
            FetchOutcome::Data(value) => FetchOutcome::Data(f(value)),
            FetchOutcome::Empty => FetchOutcome::Empty,
            FetchOutcome::Failed(e) => FetchOutcome::Failed(e),
        }
    }
}

impl<T: Default> FetchOutcome<T> {
    /// Legacy view: failures read as the empty value
    pub fn into_items(self) -> T {
        match self {
            FetchOutcome::Data(value) => value,
            FetchOutcome::Empty | FetchOutcome::Failed(_) => T::default(),
        }
    }
}
