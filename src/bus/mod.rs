//! Multicast bus
//!
//! The bus is the single process-wide object that ties the registry to the
//! data plane. Each topic with open bindings has a route; a write from one
//! binding is fanned out to the inbox of every other binding on the same
//! topic whose user is of the writer's target kind:
//!
//! ```text
//!                         topic T
//!   writer (kind A, target B) ──► route ──┬──► inbox (user kind B)
//!                                         ├──► inbox (user kind B)
//!                                         └─╳  inbox (user kind A)
//! ```
//!
//! Chunks are `Bytes`, so every recipient shares one allocation. Delivery
//! order is the order the writer's writes returned.

pub mod config;
mod route;
pub mod store;

pub use config::{BusConfig, DEFAULT_READ_CAPACITY, DEFAULT_WRITE_CAPACITY};
pub(crate) use route::Subscriber;
pub use store::Bus;
