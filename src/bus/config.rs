//! Bus configuration

/// Default read-side chunk capacity for bindings opened with bus defaults
pub const DEFAULT_READ_CAPACITY: usize = 4096;

/// Default write-side chunk capacity for bindings opened with bus defaults
pub const DEFAULT_WRITE_CAPACITY: usize = 4096;

/// Bus configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Maximum size any chunk buffer may grow to (None = unbounded)
    pub max_chunk_capacity: Option<usize>,

    /// Read capacity used by [`Bus::binding_options`](super::Bus::binding_options)
    pub default_read_capacity: usize,

    /// Write capacity used by [`Bus::binding_options`](super::Bus::binding_options)
    pub default_write_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_chunk_capacity: None,
            default_read_capacity: DEFAULT_READ_CAPACITY,
            default_write_capacity: DEFAULT_WRITE_CAPACITY,
        }
    }
}

impl BusConfig {
    /// Cap chunk buffer growth
    ///
    /// Writes that would grow a buffer past `max` fail with
    /// `CapacityExceeded`, as does opening a binding with a larger capacity.
    /// Read sizes are clamped to `max`.
    pub fn max_chunk_capacity(mut self, max: usize) -> Self {
        self.max_chunk_capacity = Some(max);
        self
    }

    /// Remove any chunk growth cap
    pub fn unbounded(mut self) -> Self {
        self.max_chunk_capacity = None;
        self
    }

    /// Set the default binding capacities
    pub fn default_capacities(mut self, read: usize, write: usize) -> Self {
        self.default_read_capacity = read;
        self.default_write_capacity = write;
        self
    }
}
