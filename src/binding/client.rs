//! Client binding
//!
//! A binding is a user's connection to one topic. Writes fan out through the
//! bus; reads drain the binding's own inbox.
//!
//! The read side sits behind an async-aware mutex so that a blocking reader
//! and an async reader share the same state, and so `close()` from another
//! context never waits on a reader. Closing drops the inbox sender held by the
//! route, which wakes the reader; the reader then releases the read side
//! itself.

use std::sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::bus::{Bus, Subscriber};
use crate::chunk::ChunkBuffer;
use crate::error::{BindingError, Error, Result};
use crate::outcome::Transfer;
use crate::registry::{BindingId, TopicHandle, UserHandle, UserKindHandle};
use crate::stats::{BindingCounters, BindingStats};
use crate::transport::adapter::read_exact_with;

use super::options::{BindingOptions, DeliveryMode};

/// Reader state: the read buffer, an unread tail and the inbox
#[derive(Debug)]
struct ReadSide {
    buffer: ChunkBuffer,
    /// Remainder of a chunk larger than the last read
    pending: Bytes,
    inbox: mpsc::UnboundedReceiver<Bytes>,
}

impl ReadSide {
    /// Move bytes from `pending` and any queued chunks into the buffer until
    /// it holds `sz` bytes or the inbox is empty
    ///
    /// Returns the number of chunks taken off the inbox.
    fn gather(&mut self, sz: usize) -> Result<u64> {
        let mut chunks = 0;
        while self.buffer.len() < sz {
            if self.pending.is_empty() {
                match self.inbox.try_recv() {
                    Ok(chunk) => {
                        self.pending = chunk;
                        chunks += 1;
                    }
                    Err(_) => break,
                }
            }

            let n = (sz - self.buffer.len()).min(self.pending.len());
            let head = self.pending.split_to(n);
            self.buffer.extend(&head)?;
        }
        Ok(chunks)
    }
}

#[derive(Debug)]
struct Inner {
    id: BindingId,
    user: UserHandle,
    user_kind: UserKindHandle,
    topic: TopicHandle,
    target_kind: UserKindHandle,
    delivery: DeliveryMode,

    bus: Arc<Bus>,
    open: AtomicBool,

    read_side: tokio::sync::Mutex<Option<ReadSide>>,
    /// Held across publish so one writer's chunks stay in order
    write_side: Mutex<Option<ChunkBuffer>>,

    read_capacity: AtomicUsize,
    write_capacity: AtomicUsize,
    counters: BindingCounters,
}

impl Inner {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Drop route and registry references
    fn detach(&self) {
        self.bus.deregister(self.topic, self.id);
        self.bus.registry().release_binding(self.user, self.topic);
    }

    fn release_read_side(&self, guard: &mut Option<ReadSide>) {
        if guard.take().is_some() {
            self.read_capacity.store(0, Ordering::Release);
        }
    }

    /// Clamp a read request to the chunk cap
    fn clamp_read(&self, sz: usize) -> usize {
        match self.bus.config().max_chunk_capacity {
            Some(limit) => sz.min(limit.max(1)),
            None => sz,
        }
    }

    /// Free the read side if the binding was closed while a reader held it
    ///
    /// Called by every read path after its guard is dropped. Paired with the
    /// fence in `close`: either `close` finds the read side unlocked, or the
    /// reader sees the binding closed.
    fn release_if_closed(&self) {
        fence(Ordering::SeqCst);
        if self.is_open() {
            return;
        }
        if let Ok(mut guard) = self.read_side.try_lock() {
            self.release_read_side(&mut guard);
        }
    }

    /// Validate state and size the read buffer
    ///
    /// Returns true if the reader has to wait for a chunk.
    fn prepare_read(&self, guard: &mut Option<ReadSide>, sz: usize) -> Result<bool> {
        if !self.is_open() {
            self.release_read_side(guard);
            return Err(Error::closed());
        }

        let side = guard.as_mut().ok_or_else(Error::closed)?;
        side.buffer.ensure_capacity(sz)?;
        side.buffer.clear();
        self.read_capacity
            .store(side.buffer.capacity(), Ordering::Release);

        Ok(side.pending.is_empty())
    }

    /// Finish a read once a chunk is available (or the inbox is gone)
    ///
    /// `received` is `None` when no wait was needed, `Some(None)` when the
    /// inbox was disconnected while waiting.
    fn complete_read(
        &self,
        guard: &mut Option<ReadSide>,
        sz: usize,
        received: Option<Option<Bytes>>,
    ) -> Result<Bytes> {
        let mut chunks = 0;

        match received {
            Some(None) => {
                self.release_read_side(guard);
                return Err(Error::closed());
            }
            Some(Some(chunk)) => {
                if let Some(side) = guard.as_mut() {
                    side.pending = chunk;
                }
                chunks += 1;
            }
            None => {}
        }

        // Closed while waiting; queued chunks are discarded
        if !self.is_open() {
            self.release_read_side(guard);
            return Err(Error::closed());
        }

        let side = guard.as_mut().ok_or_else(Error::closed)?;
        chunks += side.gather(sz)?;
        let out = side.buffer.take();

        self.counters.on_read(out.len(), chunks);
        tracing::trace!(
            binding = %self.id,
            topic = %self.topic,
            bytes = out.len(),
            chunks = chunks,
            "Read"
        );

        Ok(out)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.open.swap(false, Ordering::AcqRel) {
            self.detach();
            tracing::debug!(
                binding = %self.id,
                user = %self.user,
                topic = %self.topic,
                "Binding dropped while open, closed"
            );
        }
    }
}

/// A user's open connection to a topic
///
/// Cloning is cheap and every clone refers to the same binding, so one
/// context can `close()` while another is blocked in [`read`](Self::read).
/// The binding is closed when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct ClientBinding {
    inner: Arc<Inner>,
}

impl ClientBinding {
    /// Open a binding on `bus`
    ///
    /// Buffers are allocated first, then the registry references are taken,
    /// then the inbox is routed. A failure at any step leaves nothing behind.
    pub(crate) fn open(bus: Arc<Bus>, options: BindingOptions) -> Result<Self> {
        if bus.is_shut_down() {
            return Err(Error::closed());
        }

        let limit = bus.config().max_chunk_capacity;
        let read_buffer = ChunkBuffer::with_capacity(options.read_capacity, limit)?;
        let write_buffer = ChunkBuffer::with_capacity(options.write_capacity, limit)?;

        let (id, user_kind) = bus.registry().acquire_binding(
            options.user,
            options.topic,
            options.target_kind,
        )?;

        let (tx, rx) = mpsc::unbounded_channel();
        let subscriber = Subscriber {
            user: options.user,
            user_kind,
            inbox: tx,
        };
        if let Err(err) = bus.register(options.topic, id, subscriber) {
            bus.registry().release_binding(options.user, options.topic);
            return Err(err);
        }

        tracing::info!(
            binding = %id,
            user = %options.user,
            topic = %options.topic,
            target_kind = %options.target_kind,
            delivery = ?options.delivery,
            "Binding opened"
        );

        let inner = Inner {
            id,
            user: options.user,
            user_kind,
            topic: options.topic,
            target_kind: options.target_kind,
            delivery: options.delivery,
            bus,
            open: AtomicBool::new(true),
            read_capacity: AtomicUsize::new(read_buffer.capacity()),
            write_capacity: AtomicUsize::new(write_buffer.capacity()),
            read_side: tokio::sync::Mutex::new(Some(ReadSide {
                buffer: read_buffer,
                pending: Bytes::new(),
                inbox: rx,
            })),
            write_side: Mutex::new(Some(write_buffer)),
            counters: BindingCounters::default(),
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Close the binding
    ///
    /// A reader blocked on this binding in another context returns `Closed`.
    /// Closing twice fails with `AlreadyClosed`.
    pub fn close(&self) -> Result<()> {
        let inner = &self.inner;
        if !inner.open.swap(false, Ordering::AcqRel) {
            return Err(BindingError::AlreadyClosed.into());
        }

        inner.detach();

        if inner.write_side.lock().take().is_some() {
            inner.write_capacity.store(0, Ordering::Release);
        }
        // A reader mid-call releases the read side on its way out
        fence(Ordering::SeqCst);
        if let Ok(mut guard) = inner.read_side.try_lock() {
            inner.release_read_side(&mut guard);
        }

        let stats = inner.counters.snapshot();
        tracing::info!(
            binding = %inner.id,
            user = %inner.user,
            topic = %inner.topic,
            bytes_read = stats.bytes_read,
            bytes_written = stats.bytes_written,
            "Binding closed"
        );
        Ok(())
    }

    /// Check if the binding is open
    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::closed())
        }
    }

    /// Read up to `sz` bytes, blocking until at least one is available
    ///
    /// Leftover bytes from a previously split chunk come first; otherwise the
    /// call waits for the next chunk and then takes whatever else is already
    /// queued, up to `sz`. A chunk larger than `sz` is split across reads.
    /// `read(0)` returns an empty buffer immediately. With a chunk cap
    /// configured, `sz` is clamped to the cap.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context; use
    /// [`read_async`](Self::read_async) there.
    pub fn read(&self, sz: usize) -> Result<Bytes> {
        let result = self.read_blocking(sz);
        self.inner.release_if_closed();
        result
    }

    fn read_blocking(&self, sz: usize) -> Result<Bytes> {
        self.ensure_open()?;
        if sz == 0 {
            return Ok(Bytes::new());
        }

        let inner = &self.inner;
        let sz = inner.clamp_read(sz);
        let mut guard = inner.read_side.blocking_lock();
        let received = if inner.prepare_read(&mut guard, sz)? {
            Some(guard.as_mut().and_then(|side| side.inbox.blocking_recv()))
        } else {
            None
        };
        inner.complete_read(&mut guard, sz, received)
    }

    /// Async form of [`read`](Self::read)
    pub async fn read_async(&self, sz: usize) -> Result<Bytes> {
        let result = self.read_waiting(sz).await;
        self.inner.release_if_closed();
        result
    }

    async fn read_waiting(&self, sz: usize) -> Result<Bytes> {
        self.ensure_open()?;
        if sz == 0 {
            return Ok(Bytes::new());
        }

        let inner = &self.inner;
        let sz = inner.clamp_read(sz);
        let mut guard = inner.read_side.lock().await;
        let received = if inner.prepare_read(&mut guard, sz)? {
            match guard.as_mut() {
                Some(side) => Some(side.inbox.recv().await),
                None => Some(None),
            }
        } else {
            None
        };
        inner.complete_read(&mut guard, sz, received)
    }

    /// Read up to `sz` bytes without waiting
    ///
    /// Returns `None` if nothing is queued or another reader holds the read
    /// side.
    pub fn try_read(&self, sz: usize) -> Result<Option<Bytes>> {
        let result = self.read_ready(sz);
        self.inner.release_if_closed();
        result
    }

    fn read_ready(&self, sz: usize) -> Result<Option<Bytes>> {
        self.ensure_open()?;
        if sz == 0 {
            return Ok(Some(Bytes::new()));
        }

        let inner = &self.inner;
        let sz = inner.clamp_read(sz);
        let Ok(mut guard) = inner.read_side.try_lock() else {
            return Ok(None);
        };
        if inner.prepare_read(&mut guard, sz)? {
            let next = match guard.as_mut() {
                Some(side) => side.inbox.try_recv(),
                None => return Err(Error::closed()),
            };
            match next {
                Ok(chunk) => inner.complete_read(&mut guard, sz, Some(Some(chunk))).map(Some),
                Err(mpsc::error::TryRecvError::Empty) => Ok(None),
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    inner.complete_read(&mut guard, sz, Some(None)).map(Some)
                }
            }
        } else {
            inner.complete_read(&mut guard, sz, None).map(Some)
        }
    }

    /// Read exactly `sz` bytes
    ///
    /// Fails with `Eof` if a read makes no progress. Bytes gathered before a
    /// failure are lost.
    pub fn read_all(&self, sz: usize) -> Result<Bytes> {
        read_exact_with(sz, |n| self.read(n))
    }

    /// Async form of [`read_all`](Self::read_all)
    pub async fn read_all_async(&self, sz: usize) -> Result<Bytes> {
        let mut out = BytesMut::with_capacity(sz);
        while out.len() < sz {
            let chunk = self.read_async(sz - out.len()).await?;
            if chunk.is_empty() {
                return Err(BindingError::Eof.into());
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    /// Publish `buf` to the bindings on this topic whose user is of the
    /// target kind
    ///
    /// Returns `buf.len()`. The bytes are copied, so `buf` may be reused as
    /// soon as this returns. An empty write delivers nothing.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        self.ensure_open()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let inner = &self.inner;
        let mut guard = inner.write_side.lock();
        let buffer = guard.as_mut().ok_or_else(Error::closed)?;
        buffer.fill(buf)?;
        inner
            .write_capacity
            .store(buffer.capacity(), Ordering::Release);
        let chunk = buffer.split();

        let recipients = inner.bus.publish(
            inner.topic,
            inner.id,
            inner.target_kind,
            chunk,
            inner.delivery,
        )?;
        drop(guard);

        inner.counters.on_write(buf.len());
        tracing::trace!(
            binding = %inner.id,
            topic = %inner.topic,
            bytes = buf.len(),
            recipients = recipients,
            "Write"
        );

        Ok(buf.len())
    }

    /// Flush pending writes
    ///
    /// Writes are delivered before `write` returns, so this only checks that
    /// the binding is still open.
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()
    }

    /// Tagged form of [`read`](Self::read)
    ///
    /// The bytes are empty unless the transfer succeeded.
    pub fn read_tagged(&self, sz: usize) -> (Transfer, Bytes) {
        match self.read(sz) {
            Ok(data) => (Transfer::of(data.len(), sz), data),
            Err(err) => (Transfer::Failed(err), Bytes::new()),
        }
    }

    /// Tagged form of [`write`](Self::write)
    pub fn write_tagged(&self, buf: &[u8]) -> Transfer {
        Transfer::from_result(self.write(buf), buf.len())
    }

    /// Binding id
    pub fn id(&self) -> BindingId {
        self.inner.id
    }

    /// User the binding acts as
    pub fn user(&self) -> UserHandle {
        self.inner.user
    }

    /// Kind of the binding's user
    pub fn user_kind(&self) -> UserKindHandle {
        self.inner.user_kind
    }

    /// Topic the binding is attached to
    pub fn topic(&self) -> TopicHandle {
        self.inner.topic
    }

    /// Kind of user this binding writes to
    pub fn target_kind(&self) -> UserKindHandle {
        self.inner.target_kind
    }

    /// Recipient rule for writes
    pub fn delivery(&self) -> DeliveryMode {
        self.inner.delivery
    }

    /// Current read buffer capacity (0 once released)
    pub fn read_capacity(&self) -> usize {
        self.inner.read_capacity.load(Ordering::Acquire)
    }

    /// Current write buffer capacity (0 once released)
    pub fn write_capacity(&self) -> usize {
        self.inner.write_capacity.load(Ordering::Acquire)
    }

    /// Traffic counters
    pub fn stats(&self) -> BindingStats {
        self.inner.counters.snapshot()
    }
}
