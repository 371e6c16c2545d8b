//! Binding options

use crate::bus::{DEFAULT_READ_CAPACITY, DEFAULT_WRITE_CAPACITY};
use crate::registry::{TopicHandle, UserHandle, UserKindHandle};

/// How many recipients a write must reach
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeliveryMode {
    /// Deliver to every matching binding; zero recipients drops the chunk
    #[default]
    Multicast,
    /// Deliver only if exactly one binding matches
    Monocast,
}

/// Parameters for opening a client binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingOptions {
    /// User the binding acts as
    pub user: UserHandle,

    /// Topic the binding is attached to
    pub topic: TopicHandle,

    /// Kind of user that receives this binding's writes
    pub target_kind: UserKindHandle,

    /// Initial read buffer capacity
    pub read_capacity: usize,

    /// Initial write buffer capacity
    pub write_capacity: usize,

    /// Recipient rule for writes
    pub delivery: DeliveryMode,
}

impl BindingOptions {
    /// Options with default capacities and multicast delivery
    pub fn new(user: UserHandle, topic: TopicHandle, target_kind: UserKindHandle) -> Self {
        Self {
            user,
            topic,
            target_kind,
            read_capacity: DEFAULT_READ_CAPACITY,
            write_capacity: DEFAULT_WRITE_CAPACITY,
            delivery: DeliveryMode::default(),
        }
    }

    /// Set the initial read buffer capacity
    pub fn read_capacity(mut self, capacity: usize) -> Self {
        self.read_capacity = capacity;
        self
    }

    /// Set the initial write buffer capacity
    pub fn write_capacity(mut self, capacity: usize) -> Self {
        self.write_capacity = capacity;
        self
    }

    /// Set both buffer capacities
    pub fn capacities(self, read: usize, write: usize) -> Self {
        self.read_capacity(read).write_capacity(write)
    }

    /// Set the delivery mode
    pub fn delivery(mut self, mode: DeliveryMode) -> Self {
        self.delivery = mode;
        self
    }

    /// Require exactly one recipient per write
    pub fn monocast(self) -> Self {
        self.delivery(DeliveryMode::Monocast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::HandleKey;

    fn options() -> BindingOptions {
        BindingOptions::new(
            UserHandle::from_key(HandleKey::new(2)),
            TopicHandle::from_key(HandleKey::new(3)),
            UserKindHandle::from_key(HandleKey::new(1)),
        )
    }

    #[test]
    fn test_default_options() {
        let options = options();
        assert_eq!(options.read_capacity, DEFAULT_READ_CAPACITY);
        assert_eq!(options.write_capacity, DEFAULT_WRITE_CAPACITY);
        assert_eq!(options.delivery, DeliveryMode::Multicast);
    }

    #[test]
    fn test_builder_chaining() {
        let options = options().capacities(0, 32).monocast();
        assert_eq!(options.read_capacity, 0);
        assert_eq!(options.write_capacity, 32);
        assert_eq!(options.delivery, DeliveryMode::Monocast);
    }
}
