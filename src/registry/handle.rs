//! Interned handle types
//!
//! Every object the registry tracks is referred to by an opaque handle wrapping
//! a [`HandleKey`]. Keys come from one monotonic counter per registry, so a key
//! is never reused and a key minted for one table never resolves in another.

use std::fmt;

/// Raw key behind every handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleKey(u64);

impl HandleKey {
    /// Wrap a raw key value
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw key value
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key#{}", self.0)
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(HandleKey);

        impl $name {
            /// Rebuild a handle from a raw key
            ///
            /// The result is only meaningful for keys previously produced by
            /// the same registry; anything else resolves as a stale handle.
            pub const fn from_key(key: HandleKey) -> Self {
                Self(key)
            }

            /// Get the underlying key
            pub const fn as_key(self) -> HandleKey {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0.get())
            }
        }

        impl From<$name> for HandleKey {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }
    };
}

typed_handle!(
    /// Logical role tag used to filter delivery (e.g. "client", "server")
    UserKindHandle,
    "kind"
);

typed_handle!(
    /// Addressable endpoint belonging to exactly one user kind
    UserHandle,
    "user"
);

typed_handle!(
    /// Unlabeled rendezvous channel grouping client bindings
    TopicHandle,
    "topic"
);

typed_handle!(
    /// Identifier of one open client binding
    BindingId,
    "binding"
);
