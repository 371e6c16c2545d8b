//! Registry entry types
//!
//! Per-object state stored in the registry tables. Entries only count their
//! dependents; the dependents themselves live elsewhere.

use std::time::Instant;

use super::handle::UserKindHandle;

/// Entry for a user kind
#[derive(Debug)]
pub(super) struct KindEntry {
    /// Number of live users of this kind
    pub users: usize,
    pub created_at: Instant,
}

impl KindEntry {
    pub(super) fn new() -> Self {
        Self {
            users: 0,
            created_at: Instant::now(),
        }
    }
}

/// Entry for a user
#[derive(Debug)]
pub(super) struct UserEntry {
    /// Kind this user belongs to (back-reference, not ownership)
    pub kind: UserKindHandle,
    /// Number of open bindings for this user
    pub bindings: usize,
    pub created_at: Instant,
}

impl UserEntry {
    pub(super) fn new(kind: UserKindHandle) -> Self {
        Self {
            kind,
            bindings: 0,
            created_at: Instant::now(),
        }
    }
}

/// Entry for a topic
#[derive(Debug)]
pub(super) struct TopicEntry {
    /// Number of open bindings on this topic
    pub bindings: usize,
    pub created_at: Instant,
}

impl TopicEntry {
    pub(super) fn new() -> Self {
        Self {
            bindings: 0,
            created_at: Instant::now(),
        }
    }
}
