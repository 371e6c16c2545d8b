//! Error types for handle-bus
//!
//! Every fallible operation returns [`Result`], and every failure carries a
//! specific tag. Callers that only need the tag can match on [`Error::kind`].

use std::fmt;
use std::io;

use crate::registry::RegistryError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Handle registry failure
    Registry(RegistryError),
    /// Client binding lifecycle or transfer failure
    Binding(BindingError),
    /// Chunk buffer failure
    Chunk(ChunkError),
}

/// Client binding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// `open` on a transport that is already open
    AlreadyOpen,
    /// `close` on a binding or transport that is already closed
    AlreadyClosed,
    /// Operation attempted on, or interrupted by, a closed binding
    Closed,
    /// A read inside `read_all` made no progress
    Eof,
    /// A monocast write did not match exactly one subscriber
    RecipientMismatch {
        /// Number of subscribers that matched the target kind
        found: usize,
    },
}

/// Chunk buffer errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// Requested growth is beyond the configured limit
    CapacityExceeded {
        /// Capacity that was asked for
        requested: usize,
        /// Configured maximum
        limit: usize,
    },
}

/// Flat tag for an [`Error`], for callers that branch on the failure kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    StaleHandle,
    ReferencedByLiveObject,
    AlreadyOpen,
    AlreadyClosed,
    CapacityExceeded,
    Closed,
    Eof,
    RecipientMismatch,
}

impl Error {
    /// Get the flat tag for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Registry(RegistryError::StaleHandle(_)) => ErrorKind::StaleHandle,
            Error::Registry(RegistryError::ReferencedByLiveObject { .. }) => {
                ErrorKind::ReferencedByLiveObject
            }
            Error::Binding(BindingError::AlreadyOpen) => ErrorKind::AlreadyOpen,
            Error::Binding(BindingError::AlreadyClosed) => ErrorKind::AlreadyClosed,
            Error::Binding(BindingError::Closed) => ErrorKind::Closed,
            Error::Binding(BindingError::Eof) => ErrorKind::Eof,
            Error::Binding(BindingError::RecipientMismatch { .. }) => {
                ErrorKind::RecipientMismatch
            }
            Error::Chunk(ChunkError::CapacityExceeded { .. }) => ErrorKind::CapacityExceeded,
        }
    }

    pub(crate) fn closed() -> Self {
        Error::Binding(BindingError::Closed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Registry(e) => write!(f, "Registry error: {}", e),
            Error::Binding(e) => write!(f, "Binding error: {}", e),
            Error::Chunk(e) => write!(f, "Chunk error: {}", e),
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::AlreadyOpen => write!(f, "Already open"),
            BindingError::AlreadyClosed => write!(f, "Already closed"),
            BindingError::Closed => write!(f, "Binding is closed"),
            BindingError::Eof => write!(f, "Unexpected end of stream"),
            BindingError::RecipientMismatch { found } => {
                write!(f, "Monocast write matched {} subscribers, expected 1", found)
            }
        }
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkError::CapacityExceeded { requested, limit } => {
                write!(f, "Capacity {} exceeds limit {}", requested, limit)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Registry(e) => Some(e),
            Error::Binding(e) => Some(e),
            Error::Chunk(e) => Some(e),
        }
    }
}

impl std::error::Error for BindingError {}
impl std::error::Error for ChunkError {}

impl From<RegistryError> for Error {
    fn from(err: RegistryError) -> Self {
        Error::Registry(err)
    }
}

impl From<BindingError> for Error {
    fn from(err: BindingError) -> Self {
        Error::Binding(err)
    }
}

impl From<ChunkError> for Error {
    fn from(err: ChunkError) -> Self {
        Error::Chunk(err)
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match err.kind() {
            ErrorKind::Eof => io::ErrorKind::UnexpectedEof,
            ErrorKind::Closed | ErrorKind::AlreadyClosed => io::ErrorKind::NotConnected,
            ErrorKind::AlreadyOpen => io::ErrorKind::AlreadyExists,
            ErrorKind::CapacityExceeded => io::ErrorKind::InvalidInput,
            ErrorKind::StaleHandle => io::ErrorKind::NotFound,
            ErrorKind::ReferencedByLiveObject | ErrorKind::RecipientMismatch => {
                io::ErrorKind::Other
            }
        };
        io::Error::new(kind, err)
    }
}
