//! Handle registry implementation
//!
//! The registry owns the storage for user kinds, users and topics. All
//! mutations go through one mutex, so handle allocation and the referential
//! integrity checks never race with each other.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::stats::RegistryStats;

use super::entry::{KindEntry, TopicEntry, UserEntry};
use super::error::RegistryError;
use super::handle::{BindingId, HandleKey, TopicHandle, UserHandle, UserKindHandle};

#[derive(Debug)]
struct Tables {
    kinds: HashMap<UserKindHandle, KindEntry>,
    users: HashMap<UserHandle, UserEntry>,
    topics: HashMap<TopicHandle, TopicEntry>,
    open_bindings: usize,
    next_key: u64,
}

impl Tables {
    fn gen_key(&mut self) -> HandleKey {
        let key = HandleKey::new(self.next_key);
        self.next_key += 1;
        key
    }
}

/// Registry of interned user kinds, users and topics
#[derive(Debug)]
pub struct HandleRegistry {
    tables: Mutex<Tables>,
}

impl HandleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                kinds: HashMap::new(),
                users: HashMap::new(),
                topics: HashMap::new(),
                open_bindings: 0,
                next_key: 1,
            }),
        }
    }

    /// Create a new user kind
    pub fn create_user_kind(&self) -> UserKindHandle {
        let mut tables = self.tables.lock();
        let kind = UserKindHandle::from_key(tables.gen_key());
        tables.kinds.insert(kind, KindEntry::new());

        tracing::info!(kind = %kind, "User kind created");
        kind
    }

    /// Create a new user of the given kind
    pub fn create_user(&self, kind: UserKindHandle) -> Result<UserHandle, RegistryError> {
        let mut tables = self.tables.lock();
        if !tables.kinds.contains_key(&kind) {
            return Err(RegistryError::StaleHandle(kind.as_key()));
        }

        let user = UserHandle::from_key(tables.gen_key());
        tables.users.insert(user, UserEntry::new(kind));
        if let Some(entry) = tables.kinds.get_mut(&kind) {
            entry.users += 1;
        }

        tracing::info!(user = %user, kind = %kind, "User created");
        Ok(user)
    }

    /// Create a new topic
    pub fn create_topic(&self) -> TopicHandle {
        let mut tables = self.tables.lock();
        let topic = TopicHandle::from_key(tables.gen_key());
        tables.topics.insert(topic, TopicEntry::new());

        tracing::info!(topic = %topic, "Topic created");
        topic
    }

    /// Destroy a user kind
    ///
    /// Fails while any live user still belongs to the kind.
    pub fn destroy_user_kind(&self, kind: UserKindHandle) -> Result<(), RegistryError> {
        let mut tables = self.tables.lock();
        let entry = tables
            .kinds
            .get(&kind)
            .ok_or(RegistryError::StaleHandle(kind.as_key()))?;

        if entry.users > 0 {
            tracing::warn!(kind = %kind, users = entry.users, "Refusing to destroy user kind");
            return Err(RegistryError::ReferencedByLiveObject {
                key: kind.as_key(),
                dependents: entry.users,
            });
        }

        if let Some(entry) = tables.kinds.remove(&kind) {
            tracing::info!(
                kind = %kind,
                lifetime_ms = entry.created_at.elapsed().as_millis() as u64,
                "User kind destroyed"
            );
        }
        Ok(())
    }

    /// Destroy a user
    ///
    /// Fails while any client binding for the user is still open.
    pub fn destroy_user(&self, user: UserHandle) -> Result<(), RegistryError> {
        let mut tables = self.tables.lock();
        let entry = tables
            .users
            .get(&user)
            .ok_or(RegistryError::StaleHandle(user.as_key()))?;

        if entry.bindings > 0 {
            tracing::warn!(user = %user, bindings = entry.bindings, "Refusing to destroy user");
            return Err(RegistryError::ReferencedByLiveObject {
                key: user.as_key(),
                dependents: entry.bindings,
            });
        }

        if let Some(entry) = tables.users.remove(&user) {
            if let Some(kind) = tables.kinds.get_mut(&entry.kind) {
                kind.users = kind.users.saturating_sub(1);
            }
            tracing::info!(
                user = %user,
                kind = %entry.kind,
                lifetime_ms = entry.created_at.elapsed().as_millis() as u64,
                "User destroyed"
            );
        }
        Ok(())
    }

    /// Destroy a topic
    ///
    /// Fails while any client binding on the topic is still open.
    pub fn destroy_topic(&self, topic: TopicHandle) -> Result<(), RegistryError> {
        let mut tables = self.tables.lock();
        let entry = tables
            .topics
            .get(&topic)
            .ok_or(RegistryError::StaleHandle(topic.as_key()))?;

        if entry.bindings > 0 {
            tracing::warn!(topic = %topic, bindings = entry.bindings, "Refusing to destroy topic");
            return Err(RegistryError::ReferencedByLiveObject {
                key: topic.as_key(),
                dependents: entry.bindings,
            });
        }

        if let Some(entry) = tables.topics.remove(&topic) {
            tracing::info!(
                topic = %topic,
                lifetime_ms = entry.created_at.elapsed().as_millis() as u64,
                "Topic destroyed"
            );
        }
        Ok(())
    }

    /// Look up the kind of a live user
    pub fn kind_of(&self, user: UserHandle) -> Result<UserKindHandle, RegistryError> {
        self.tables
            .lock()
            .users
            .get(&user)
            .map(|entry| entry.kind)
            .ok_or(RegistryError::StaleHandle(user.as_key()))
    }

    /// Check whether a user kind is live
    pub fn contains_user_kind(&self, kind: UserKindHandle) -> bool {
        self.tables.lock().kinds.contains_key(&kind)
    }

    /// Check whether a user is live
    pub fn contains_user(&self, user: UserHandle) -> bool {
        self.tables.lock().users.contains_key(&user)
    }

    /// Check whether a topic is live
    pub fn contains_topic(&self, topic: TopicHandle) -> bool {
        self.tables.lock().topics.contains_key(&topic)
    }

    /// Record a new binding against a user and topic
    ///
    /// All three handles are validated before anything changes. Returns the
    /// new binding's id and the kind of `user`.
    pub(crate) fn acquire_binding(
        &self,
        user: UserHandle,
        topic: TopicHandle,
        target_kind: UserKindHandle,
    ) -> Result<(BindingId, UserKindHandle), RegistryError> {
        let mut tables = self.tables.lock();

        let user_kind = tables
            .users
            .get(&user)
            .map(|entry| entry.kind)
            .ok_or(RegistryError::StaleHandle(user.as_key()))?;
        if !tables.topics.contains_key(&topic) {
            return Err(RegistryError::StaleHandle(topic.as_key()));
        }
        if !tables.kinds.contains_key(&target_kind) {
            return Err(RegistryError::StaleHandle(target_kind.as_key()));
        }

        let id = BindingId::from_key(tables.gen_key());
        if let Some(entry) = tables.users.get_mut(&user) {
            entry.bindings += 1;
        }
        if let Some(entry) = tables.topics.get_mut(&topic) {
            entry.bindings += 1;
        }
        tables.open_bindings += 1;

        Ok((id, user_kind))
    }

    /// Drop the references taken by [`acquire_binding`](Self::acquire_binding)
    pub(crate) fn release_binding(&self, user: UserHandle, topic: TopicHandle) {
        let mut tables = self.tables.lock();
        if let Some(entry) = tables.users.get_mut(&user) {
            entry.bindings = entry.bindings.saturating_sub(1);
        }
        if let Some(entry) = tables.topics.get_mut(&topic) {
            entry.bindings = entry.bindings.saturating_sub(1);
        }
        tables.open_bindings = tables.open_bindings.saturating_sub(1);
    }

    /// Get live object counts
    pub fn stats(&self) -> RegistryStats {
        let tables = self.tables.lock();
        RegistryStats {
            user_kinds: tables.kinds.len(),
            users: tables.users.len(),
            topics: tables.topics.len(),
            bindings: tables.open_bindings,
        }
    }
}

impl Default for HandleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
