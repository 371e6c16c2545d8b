//! Client bindings
//!
//! A [`ClientBinding`] attaches one user to one topic with a target user kind:
//! it reads what other bindings on the topic send to its user's kind, and
//! writes to the bindings whose user is of the target kind.
//!
//! Two bindings on the same topic with crossed kinds form a bidirectional
//! channel. Several bindings of the same kind on a topic all receive every
//! write aimed at that kind.

pub mod client;
pub mod options;

pub use client::ClientBinding;
pub use options::{BindingOptions, DeliveryMode};
