//! Tagged operation outcomes
//!
//! Sum types for callers that sit on a boundary where every operation must
//! report a tag (created / succeeded / complete / partial / failed) rather
//! than a bare `Result`. Each converts from and back into the crate's
//! [`Result`](crate::error::Result), so nothing is coerced to a boolean on
//! the way through.

use crate::error::{Error, Result};

/// Outcome of creating an interned object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Creation<H> {
    /// Object was registered under the handle
    Created(H),
    /// Nothing was registered
    Failed(Error),
}

impl<H> Creation<H> {
    /// Check if the object was created
    pub fn is_created(&self) -> bool {
        matches!(self, Creation::Created(_))
    }

    /// Get the handle, if created
    pub fn handle(&self) -> Option<&H> {
        match self {
            Creation::Created(handle) => Some(handle),
            Creation::Failed(_) => None,
        }
    }

    /// Convert back into a `Result`
    pub fn into_result(self) -> Result<H> {
        match self {
            Creation::Created(handle) => Ok(handle),
            Creation::Failed(err) => Err(err),
        }
    }
}

impl<H, E: Into<Error>> From<std::result::Result<H, E>> for Creation<H> {
    fn from(result: std::result::Result<H, E>) -> Self {
        match result {
            Ok(handle) => Creation::Created(handle),
            Err(err) => Creation::Failed(err.into()),
        }
    }
}

/// Outcome of destroying an interned object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destruction {
    /// Object was released
    Succeeded,
    /// Object is untouched
    Failed(Error),
}

impl Destruction {
    /// Check if the object was destroyed
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Destruction::Succeeded)
    }

    /// Convert back into a `Result`
    pub fn into_result(self) -> Result<()> {
        match self {
            Destruction::Succeeded => Ok(()),
            Destruction::Failed(err) => Err(err),
        }
    }
}

impl<E: Into<Error>> From<std::result::Result<(), E>> for Destruction {
    fn from(result: std::result::Result<(), E>) -> Self {
        match result {
            Ok(()) => Destruction::Succeeded,
            Err(err) => Destruction::Failed(err.into()),
        }
    }
}

/// Outcome of a read or write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transfer {
    /// Every requested byte was transferred
    Complete(usize),
    /// Fewer bytes than requested were transferred
    Partial {
        /// Bytes actually transferred
        transferred: usize,
        /// Bytes asked for
        requested: usize,
    },
    /// Nothing was transferred
    Failed(Error),
}

impl Transfer {
    /// Classify a transfer of `transferred` bytes out of `requested`
    pub fn of(transferred: usize, requested: usize) -> Self {
        if transferred >= requested {
            Transfer::Complete(transferred)
        } else {
            Transfer::Partial {
                transferred,
                requested,
            }
        }
    }

    /// Classify a transfer result against the requested size
    pub fn from_result(result: Result<usize>, requested: usize) -> Self {
        match result {
            Ok(transferred) => Transfer::of(transferred, requested),
            Err(err) => Transfer::Failed(err),
        }
    }

    /// Bytes transferred (0 on failure)
    pub fn transferred(&self) -> usize {
        match self {
            Transfer::Complete(n) => *n,
            Transfer::Partial { transferred, .. } => *transferred,
            Transfer::Failed(_) => 0,
        }
    }

    /// Check if the transfer failed
    pub fn is_failed(&self) -> bool {
        matches!(self, Transfer::Failed(_))
    }

    /// Convert back into a `Result` carrying the byte count
    pub fn into_result(self) -> Result<usize> {
        match self {
            Transfer::Complete(n) => Ok(n),
            Transfer::Partial { transferred, .. } => Ok(transferred),
            Transfer::Failed(err) => Err(err),
        }
    }
}
