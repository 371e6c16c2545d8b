//! Chunk buffers
//!
//! The chunk buffer is the only unit of data exchange with the bus. Each
//! client binding owns one per direction and releases them when it closes.

pub mod buffer;

pub use buffer::ChunkBuffer;
