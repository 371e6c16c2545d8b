//! Transport adapter
//!
//! Presents a client binding as a generic byte stream, both through the
//! crate's own [`ByteTransport`] contract and through `std::io::{Read, Write}`.

pub mod adapter;
mod io;

pub use adapter::{BusTransport, ByteTransport};
