//! Handle registry for user kinds, users and topics
//!
//! The registry allocates, tracks and retires the opaque handles that every
//! other part of the crate refers to. It enforces referential integrity on
//! destroy:
//!
//! ```text
//!   UserKind ◄──── User ◄──── ClientBinding ────► Topic
//!      ▲            (kind)      (user, topic)
//!      │
//!   destroy fails while a live arrow points at the object
//! ```
//!
//! Destroying a handle twice is a [`RegistryError::StaleHandle`], never a no-op,
//! so callers have to track their own resource lifetimes precisely.

mod entry;
pub mod error;
pub mod handle;
pub mod store;

pub use error::RegistryError;
pub use handle::{BindingId, HandleKey, TopicHandle, UserHandle, UserKindHandle};
pub use store::HandleRegistry;
