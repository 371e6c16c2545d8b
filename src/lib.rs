//! handle-bus: in-process multicast transport over interned handles
//!
//! Components refer to each other through opaque handles issued by a
//! [`HandleRegistry`]: user kinds, users of a kind, and topics. A user opens a
//! [`ClientBinding`] on a topic with a target kind; its writes reach every
//! other binding on the topic whose user is of that kind. A
//! [`BusTransport`] wraps a binding as a byte stream for an RPC layer.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use handle_bus::Bus;
//!
//! let bus = Arc::new(Bus::new());
//! let clients = bus.create_user_kind();
//! let servers = bus.create_user_kind();
//! let alice = bus.create_user(clients)?;
//! let server = bus.create_user(servers)?;
//! let topic = bus.create_topic();
//!
//! let a = bus.open(alice, topic, servers, 64, 64)?;
//! let s = bus.open(server, topic, clients, 64, 64)?;
//!
//! a.write(b"hello")?;
//! assert_eq!(&s.read(64)?[..], b"hello");
//!
//! a.close()?;
//! s.close()?;
//! bus.destroy_user(alice)?;
//! # Ok::<(), handle_bus::Error>(())
//! ```

pub mod binding;
pub mod bus;
pub mod chunk;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod stats;
pub mod transport;

pub use binding::{BindingOptions, ClientBinding, DeliveryMode};
pub use bus::{Bus, BusConfig};
pub use chunk::ChunkBuffer;
pub use error::{BindingError, ChunkError, Error, ErrorKind, Result};
pub use outcome::{Creation, Destruction, Transfer};
pub use registry::{
    BindingId, HandleKey, HandleRegistry, RegistryError, TopicHandle, UserHandle, UserKindHandle,
};
pub use stats::{BindingStats, RegistryStats, TopicStats};
pub use transport::{BusTransport, ByteTransport};
