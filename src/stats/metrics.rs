//! Statistics for the registry, topics and bindings

use std::sync::atomic::{AtomicU64, Ordering};

/// Registry-wide live object counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Live user kinds
    pub user_kinds: usize,
    /// Live users
    pub users: usize,
    /// Live topics
    pub topics: usize,
    /// Open client bindings
    pub bindings: usize,
}

impl RegistryStats {
    /// Total number of live interned objects, including open bindings
    pub fn live_objects(&self) -> usize {
        self.user_kinds + self.users + self.topics + self.bindings
    }
}

/// Per-topic routing statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicStats {
    /// Bindings currently registered on the topic
    pub bindings: usize,
    /// Number of distinct user kinds among those bindings
    pub kinds: usize,
    /// Chunks published on the topic
    pub chunks_published: u64,
    /// Chunk deliveries (one per recipient)
    pub deliveries: u64,
}

/// Snapshot of one binding's traffic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingStats {
    /// Bytes returned by reads
    pub bytes_read: u64,
    /// Bytes accepted by writes
    pub bytes_written: u64,
    /// Chunks taken off the inbox
    pub chunks_read: u64,
    /// Chunks handed to the bus
    pub chunks_written: u64,
}

/// Live counters behind [`BindingStats`]
#[derive(Debug, Default)]
pub(crate) struct BindingCounters {
    bytes_read: AtomicU64,
    bytes_written: AtomicU64,
    chunks_read: AtomicU64,
    chunks_written: AtomicU64,
}

impl BindingCounters {
    pub(crate) fn on_read(&self, bytes: usize, chunks: u64) {
        self.bytes_read.fetch_add(bytes as u64, Ordering::Relaxed);
        self.chunks_read.fetch_add(chunks, Ordering::Relaxed);
    }

    pub(crate) fn on_write(&self, bytes: usize) {
        self.bytes_written.fetch_add(bytes as u64, Ordering::Relaxed);
        self.chunks_written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BindingStats {
        BindingStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            chunks_read: self.chunks_read.load(Ordering::Relaxed),
            chunks_written: self.chunks_written.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_stats_live_objects() {
        let stats = RegistryStats {
            user_kinds: 2,
            users: 3,
            topics: 1,
            bindings: 2,
        };
        assert_eq!(stats.live_objects(), 8);
        assert_eq!(RegistryStats::default().live_objects(), 0);
    }

    #[test]
    fn test_binding_counters() {
        let counters = BindingCounters::default();
        counters.on_write(4);
        counters.on_write(6);
        counters.on_read(7, 2);

        let stats = counters.snapshot();
        assert_eq!(stats.bytes_written, 10);
        assert_eq!(stats.chunks_written, 2);
        assert_eq!(stats.bytes_read, 7);
        assert_eq!(stats.chunks_read, 2);
    }
}
