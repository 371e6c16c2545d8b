//! Capacity-bounded, resizable byte buffer
//!
//! A [`ChunkBuffer`] is the unit of data exchange between a client binding and
//! the bus. It holds a byte region, a logical length (bytes currently valid)
//! and a capacity (bytes allocated), with `len() <= capacity()` at all times.
//!
//! Growth never shrinks the buffer; only [`ChunkBuffer::split`] gives the
//! allocation away, together with the bytes it hands off. Growing past the current capacity may
//! reallocate, so any slice previously borrowed from the buffer must not be
//! held across a call that grows it; the borrow checker enforces this.

use bytes::{Bytes, BytesMut};

use crate::error::ChunkError;

/// Owned, growable byte buffer with an optional growth limit
#[derive(Debug)]
pub struct ChunkBuffer {
    data: BytesMut,
    limit: Option<usize>,
}

impl ChunkBuffer {
    /// Allocate a buffer with the given capacity
    ///
    /// Fails if `capacity` is already beyond `limit`.
    pub fn with_capacity(capacity: usize, limit: Option<usize>) -> Result<Self, ChunkError> {
        check_limit(capacity, limit)?;
        Ok(Self {
            data: BytesMut::with_capacity(capacity),
            limit,
        })
    }

    /// Allocate a buffer without a growth limit
    pub fn unbounded(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            limit: None,
        }
    }

    /// Number of valid bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer holds no valid bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes allocated
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Growth limit, if any
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Valid bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Grow to at least `capacity` bytes
    ///
    /// Does nothing if the buffer is already large enough.
    pub fn ensure_capacity(&mut self, capacity: usize) -> Result<(), ChunkError> {
        check_limit(capacity, self.limit)?;
        if capacity <= self.data.capacity() {
            return Ok(());
        }

        let previous = self.data.capacity();
        self.data.reserve(capacity - self.data.len());
        tracing::trace!(from = previous, to = self.data.capacity(), "Chunk buffer grown");
        Ok(())
    }

    /// Replace the contents with `src`
    pub fn fill(&mut self, src: &[u8]) -> Result<(), ChunkError> {
        self.ensure_capacity(src.len())?;
        self.data.clear();
        self.data.extend_from_slice(src);
        Ok(())
    }

    /// Append `src` to the valid bytes
    pub fn extend(&mut self, src: &[u8]) -> Result<(), ChunkError> {
        self.ensure_capacity(self.data.len() + src.len())?;
        self.data.extend_from_slice(src);
        Ok(())
    }

    /// Copy the valid bytes out as an owned [`Bytes`] and reset the length
    ///
    /// The allocation is kept for the next call.
    pub fn take(&mut self) -> Bytes {
        let out = Bytes::copy_from_slice(&self.data);
        self.data.clear();
        out
    }

    /// Hand the valid bytes off as [`Bytes`] without copying
    ///
    /// The returned bytes keep the front of the allocation; the buffer keeps
    /// the unused tail, and later growth reclaims the whole region once every
    /// clone of the returned `Bytes` is dropped.
    pub fn split(&mut self) -> Bytes {
        self.data.split().freeze()
    }

    /// Copy the valid bytes out without resetting the length
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }

    /// Reset the length to zero, keeping the allocation
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

fn check_limit(requested: usize, limit: Option<usize>) -> Result<(), ChunkError> {
    match limit {
        Some(limit) if requested > limit => {
            Err(ChunkError::CapacityExceeded { requested, limit })
        }
        _ => Ok(()),
    }
}
