//! Bus implementation
//!
//! The bus owns the handle registry and the per-topic routes, and moves chunks
//! from a writing binding to every matching binding on the same topic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use crate::binding::{BindingOptions, ClientBinding, DeliveryMode};
use crate::error::{BindingError, Error, Result};
use crate::outcome::{Creation, Destruction};
use crate::registry::{BindingId, HandleRegistry, TopicHandle, UserHandle, UserKindHandle};
use crate::stats::{RegistryStats, TopicStats};

use super::config::BusConfig;
use super::route::{Route, Subscriber};

/// In-process multicast bus
///
/// Construct one per process (or per test) and share it as `Arc<Bus>`; client
/// bindings keep a reference to the bus they were opened on.
///
/// Thread-safe. The registry serializes create/destroy behind one mutex; the
/// route table is a `RwLock` taken shared on every publish, so writers on
/// different threads enqueue concurrently.
///
/// Chunks only enter the bus through [`ClientBinding::write`], so a sender
/// always publishes as itself:
///
/// ```compile_fail
/// use handle_bus::{Bus, BindingId, DeliveryMode, HandleKey};
///
/// let bus = Bus::new();
/// let topic = bus.create_topic();
/// let kind = bus.create_user_kind();
/// let someone_else = BindingId::from_key(HandleKey::new(1));
/// bus.publish(topic, someone_else, kind, bytes::Bytes::new(), DeliveryMode::Multicast);
/// ```
#[derive(Debug)]
pub struct Bus {
    registry: HandleRegistry,

    /// Map of topic to the bindings currently registered on it
    routes: RwLock<HashMap<TopicHandle, Route>>,

    config: BusConfig,

    shut_down: AtomicBool,
}

impl Bus {
    /// Create a new bus with default configuration
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Create a new bus with custom configuration
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            registry: HandleRegistry::new(),
            routes: RwLock::new(HashMap::new()),
            config,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Get the bus configuration
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Get the handle registry
    pub fn registry(&self) -> &HandleRegistry {
        &self.registry
    }

    /// Get live object counts from the registry
    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Create a user kind
    pub fn create_user_kind(&self) -> UserKindHandle {
        self.registry.create_user_kind()
    }

    /// Create a user of `kind`
    pub fn create_user(&self, kind: UserKindHandle) -> Result<UserHandle> {
        Ok(self.registry.create_user(kind)?)
    }

    /// Create a topic
    pub fn create_topic(&self) -> TopicHandle {
        self.registry.create_topic()
    }

    /// Destroy a user kind; fails while users of the kind are live
    pub fn destroy_user_kind(&self, kind: UserKindHandle) -> Result<()> {
        Ok(self.registry.destroy_user_kind(kind)?)
    }

    /// Destroy a user; fails while bindings for the user are open
    pub fn destroy_user(&self, user: UserHandle) -> Result<()> {
        Ok(self.registry.destroy_user(user)?)
    }

    /// Destroy a topic; fails while bindings on the topic are open
    pub fn destroy_topic(&self, topic: TopicHandle) -> Result<()> {
        Ok(self.registry.destroy_topic(topic)?)
    }

    /// Tagged form of [`create_user_kind`](Self::create_user_kind)
    pub fn create_user_kind_tagged(&self) -> Creation<UserKindHandle> {
        Creation::Created(self.create_user_kind())
    }

    /// Tagged form of [`create_user`](Self::create_user)
    pub fn create_user_tagged(&self, kind: UserKindHandle) -> Creation<UserHandle> {
        self.create_user(kind).into()
    }

    /// Tagged form of [`create_topic`](Self::create_topic)
    pub fn create_topic_tagged(&self) -> Creation<TopicHandle> {
        Creation::Created(self.create_topic())
    }

    /// Tagged form of [`destroy_user_kind`](Self::destroy_user_kind)
    pub fn destroy_user_kind_tagged(&self, kind: UserKindHandle) -> Destruction {
        self.destroy_user_kind(kind).into()
    }

    /// Tagged form of [`destroy_user`](Self::destroy_user)
    pub fn destroy_user_tagged(&self, user: UserHandle) -> Destruction {
        self.destroy_user(user).into()
    }

    /// Tagged form of [`destroy_topic`](Self::destroy_topic)
    pub fn destroy_topic_tagged(&self, topic: TopicHandle) -> Destruction {
        self.destroy_topic(topic).into()
    }

    /// Binding options seeded with this bus's default capacities
    pub fn binding_options(
        &self,
        user: UserHandle,
        topic: TopicHandle,
        target_kind: UserKindHandle,
    ) -> BindingOptions {
        BindingOptions::new(user, topic, target_kind).capacities(
            self.config.default_read_capacity,
            self.config.default_write_capacity,
        )
    }

    /// Open a client binding
    ///
    /// `user` reads chunks written to `topic` by bindings targeting its kind,
    /// and writes chunks to the bindings on `topic` whose user is of
    /// `target_kind`.
    pub fn open(
        self: &Arc<Self>,
        user: UserHandle,
        topic: TopicHandle,
        target_kind: UserKindHandle,
        read_capacity: usize,
        write_capacity: usize,
    ) -> Result<ClientBinding> {
        let options =
            BindingOptions::new(user, topic, target_kind).capacities(read_capacity, write_capacity);
        self.open_with(options)
    }

    /// Open a client binding from options
    pub fn open_with(self: &Arc<Self>, options: BindingOptions) -> Result<ClientBinding> {
        ClientBinding::open(Arc::clone(self), options)
    }

    /// Deliver `data` from binding `from` to every other binding on `topic`
    /// whose user is of `target_kind`
    ///
    /// Returns the number of recipients. In [`DeliveryMode::Multicast`] zero
    /// recipients is not an error; the chunk is dropped. In
    /// [`DeliveryMode::Monocast`] anything other than exactly one recipient
    /// fails with `RecipientMismatch` and nothing is delivered.
    pub(crate) fn publish(
        &self,
        topic: TopicHandle,
        from: BindingId,
        target_kind: UserKindHandle,
        data: Bytes,
        mode: DeliveryMode,
    ) -> Result<usize> {
        if self.is_shut_down() {
            return Err(Error::closed());
        }

        let routes = self.routes.read();
        let Some(route) = routes.get(&topic) else {
            return match mode {
                DeliveryMode::Multicast => Ok(0),
                DeliveryMode::Monocast => {
                    Err(BindingError::RecipientMismatch { found: 0 }.into())
                }
            };
        };

        if mode == DeliveryMode::Monocast {
            let found = route.matching(from, target_kind);
            if found != 1 {
                tracing::warn!(
                    topic = %topic,
                    binding = %from,
                    target_kind = %target_kind,
                    found = found,
                    "Monocast write without a single recipient"
                );
                return Err(BindingError::RecipientMismatch { found }.into());
            }
        }

        let delivered = route.deliver(from, target_kind, &data);

        tracing::trace!(
            topic = %topic,
            binding = %from,
            target_kind = %target_kind,
            bytes = data.len(),
            recipients = delivered,
            "Chunk published"
        );

        Ok(delivered)
    }

    /// Add a binding to a topic's route
    pub(crate) fn register(
        &self,
        topic: TopicHandle,
        id: BindingId,
        subscriber: Subscriber,
    ) -> Result<()> {
        let mut routes = self.routes.write();
        // Checked under the write lock so shutdown cannot miss this binding
        if self.is_shut_down() {
            return Err(Error::closed());
        }
        routes.entry(topic).or_default().insert(id, subscriber);

        tracing::debug!(topic = %topic, binding = %id, "Binding routed");
        Ok(())
    }

    /// Remove a binding from a topic's route
    ///
    /// Dropping the subscriber drops the only sender for the binding's inbox,
    /// which wakes a reader blocked on it.
    pub(crate) fn deregister(&self, topic: TopicHandle, id: BindingId) -> bool {
        let removed = {
            let mut routes = self.routes.write();
            let removed = routes.get_mut(&topic).and_then(|route| route.remove(id));
            if routes.get(&topic).is_some_and(Route::is_empty) {
                routes.remove(&topic);
                tracing::debug!(topic = %topic, "Route removed");
            }
            removed
        };
        removed.is_some()
    }

    /// Get routing statistics for a topic with at least one open binding
    pub fn topic_stats(&self, topic: TopicHandle) -> Option<TopicStats> {
        self.routes.read().get(&topic).map(Route::stats)
    }

    /// Number of topics with at least one open binding
    pub fn route_count(&self) -> usize {
        self.routes.read().len()
    }

    /// Check if [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Tear down all routes
    ///
    /// Every blocked reader is released with `Closed`, and further opens and
    /// writes fail with `Closed`. Bindings still have to be closed to release
    /// their registry references.
    pub fn shutdown(&self) {
        let routes = {
            let mut routes = self.routes.write();
            self.shut_down.store(true, Ordering::Release);
            std::mem::take(&mut *routes)
        };

        let bindings: usize = routes.values().map(|route| route.stats().bindings).sum();
        tracing::info!(topics = routes.len(), bindings = bindings, "Bus shut down");
        drop(routes);
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn setup() -> (Arc<Bus>, UserKindHandle, UserKindHandle, TopicHandle) {
        let bus = Arc::new(Bus::new());
        let client = bus.create_user_kind();
        let server = bus.create_user_kind();
        let topic = bus.create_topic();
        (bus, client, server, topic)
    }

    #[test]
    fn test_open_registers_route() {
        let (bus, client, server, topic) = setup();
        let user = bus.create_user(client).unwrap();

        assert_eq!(bus.route_count(), 0);
        let binding = bus.open(user, topic, server, 64, 64).unwrap();
        assert_eq!(bus.route_count(), 1);
        assert_eq!(bus.topic_stats(topic).unwrap().bindings, 1);

        binding.close().unwrap();
        assert_eq!(bus.route_count(), 0);
        assert!(bus.topic_stats(topic).is_none());
    }

    #[test]
    fn test_publish_without_route() {
        let (bus, _client, server, topic) = setup();
        let from = BindingId::from_key(crate::registry::HandleKey::new(999));

        let sent = bus.publish(
            topic,
            from,
            server,
            Bytes::from_static(b"dropped"),
            DeliveryMode::Multicast,
        );
        assert_eq!(sent.unwrap(), 0);

        let sent = bus.publish(
            topic,
            from,
            server,
            Bytes::from_static(b"dropped"),
            DeliveryMode::Monocast,
        );
        assert_eq!(sent.unwrap_err().kind(), ErrorKind::RecipientMismatch);
    }

    #[test]
    fn test_tagged_lifecycle() {
        let bus = Bus::new();

        let kind = match bus.create_user_kind_tagged() {
            Creation::Created(kind) => kind,
            Creation::Failed(err) => panic!("unexpected failure: {}", err),
        };
        let user = bus.create_user_tagged(kind).into_result().unwrap();

        match bus.destroy_user_kind_tagged(kind) {
            Destruction::Failed(err) => assert_eq!(err.kind(), ErrorKind::ReferencedByLiveObject),
            Destruction::Succeeded => panic!("kind with a live user was destroyed"),
        }

        assert_eq!(bus.destroy_user_tagged(user), Destruction::Succeeded);
        assert_eq!(bus.destroy_user_kind_tagged(kind), Destruction::Succeeded);
        assert!(!bus.destroy_user_kind_tagged(kind).is_succeeded());
    }

    #[test]
    fn test_binding_options_use_config_defaults() {
        let bus = Bus::with_config(BusConfig::default().default_capacities(16, 32));
        let kind = bus.create_user_kind();
        let user = bus.create_user(kind).unwrap();
        let topic = bus.create_topic();

        let options = bus.binding_options(user, topic, kind);
        assert_eq!(options.read_capacity, 16);
        assert_eq!(options.write_capacity, 32);
    }

    #[test]
    fn test_shutdown_rejects_open_and_publish() {
        let (bus, client, server, topic) = setup();
        let user = bus.create_user(client).unwrap();
        let binding = bus.open(user, topic, server, 8, 8).unwrap();

        bus.shutdown();
        assert!(bus.is_shut_down());
        assert_eq!(bus.route_count(), 0);

        assert_eq!(binding.write(b"late").unwrap_err().kind(), ErrorKind::Closed);
        let reopened = bus.open(user, topic, server, 8, 8);
        assert_eq!(reopened.unwrap_err().kind(), ErrorKind::Closed);

        // Registry references are still held until the binding is closed
        assert_eq!(bus.registry_stats().bindings, 1);
        binding.close().unwrap();
        assert_eq!(bus.registry_stats().bindings, 0);
    }
}
