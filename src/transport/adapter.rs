//! Byte-stream transport over a client binding

use std::sync::Arc;

use bytes::{Bytes, BytesMut};

use crate::binding::{BindingOptions, ClientBinding};
use crate::bus::Bus;
use crate::error::{BindingError, Error, Result};

/// Stream contract consumed by an RPC layer
///
/// Implementations deliver bytes in order and may return fewer bytes than
/// asked for from [`read`](Self::read), but never zero for a nonzero request
/// unless the stream has ended.
pub trait ByteTransport {
    /// Check if the transport is open
    fn is_open(&self) -> bool;

    /// Open the transport; fails with `AlreadyOpen` if it is open
    fn open(&mut self) -> Result<()>;

    /// Close the transport; fails with `AlreadyClosed` if it is closed
    fn close(&mut self) -> Result<()>;

    /// Read up to `sz` bytes, waiting for at least one
    fn read(&mut self, sz: usize) -> Result<Bytes>;

    /// Read exactly `sz` bytes
    ///
    /// Fails with `Eof` if a read makes no progress.
    fn read_all(&mut self, sz: usize) -> Result<Bytes> {
        read_exact_with(sz, |n| self.read(n))
    }

    /// Write all of `buf`, returning the number of bytes accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Flush buffered writes
    fn flush(&mut self) -> Result<()>;
}

/// Call `read` until `sz` bytes are gathered; `Eof` on a read with no progress
pub(crate) fn read_exact_with<F>(sz: usize, mut read: F) -> Result<Bytes>
where
    F: FnMut(usize) -> Result<Bytes>,
{
    let mut out = BytesMut::with_capacity(sz);
    while out.len() < sz {
        let chunk = read(sz - out.len())?;
        if chunk.is_empty() {
            return Err(BindingError::Eof.into());
        }
        out.extend_from_slice(&chunk);
    }
    Ok(out.freeze())
}

/// [`ByteTransport`] backed by a [`ClientBinding`] on a [`Bus`]
///
/// The binding is opened on [`open`](ByteTransport::open) from the stored
/// options, and a closed transport can be opened again.
#[derive(Debug)]
pub struct BusTransport {
    bus: Arc<Bus>,
    options: BindingOptions,
    binding: Option<ClientBinding>,
}

impl BusTransport {
    /// Create a closed transport
    pub fn new(bus: Arc<Bus>, options: BindingOptions) -> Self {
        Self {
            bus,
            options,
            binding: None,
        }
    }

    /// Create a transport and open it
    pub fn connect(bus: Arc<Bus>, options: BindingOptions) -> Result<Self> {
        let mut transport = Self::new(bus, options);
        transport.open()?;
        Ok(transport)
    }

    /// Options the binding is opened with
    pub fn options(&self) -> &BindingOptions {
        &self.options
    }

    /// The live binding, if open
    ///
    /// Closing the returned binding from another context releases a read
    /// blocked on this transport.
    pub fn binding(&self) -> Option<&ClientBinding> {
        self.binding.as_ref().filter(|binding| binding.is_open())
    }

    fn live(&self) -> Result<&ClientBinding> {
        self.binding().ok_or_else(Error::closed)
    }
}

impl ByteTransport for BusTransport {
    fn is_open(&self) -> bool {
        self.binding().is_some()
    }

    fn open(&mut self) -> Result<()> {
        if self.is_open() {
            return Err(BindingError::AlreadyOpen.into());
        }
        let binding = self.bus.open_with(self.options.clone())?;
        self.binding = Some(binding);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match self.binding.take() {
            Some(binding) => binding.close(),
            None => Err(BindingError::AlreadyClosed.into()),
        }
    }

    fn read(&mut self, sz: usize) -> Result<Bytes> {
        self.live()?.read(sz)
    }

    fn read_all(&mut self, sz: usize) -> Result<Bytes> {
        self.live()?.read_all(sz)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.live()?.write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        self.live()?.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::registry::{TopicHandle, UserKindHandle};

    fn transports() -> (Arc<Bus>, BusTransport, BusTransport, TopicHandle) {
        let bus = Arc::new(Bus::new());
        let client_kind: UserKindHandle = bus.create_user_kind();
        let server_kind = bus.create_user_kind();
        let client = bus.create_user(client_kind).unwrap();
        let server = bus.create_user(server_kind).unwrap();
        let topic = bus.create_topic();

        let a = BusTransport::new(
            Arc::clone(&bus),
            bus.binding_options(client, topic, server_kind),
        );
        let b = BusTransport::new(
            Arc::clone(&bus),
            bus.binding_options(server, topic, client_kind),
        );
        (bus, a, b, topic)
    }

    /// Transport that serves a fixed script of reads, then reports no data
    struct Scripted {
        reads: Vec<Bytes>,
        written: Vec<u8>,
    }

    impl ByteTransport for Scripted {
        fn is_open(&self) -> bool {
            true
        }

        fn open(&mut self) -> Result<()> {
            Err(BindingError::AlreadyOpen.into())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn read(&mut self, sz: usize) -> Result<Bytes> {
            if self.reads.is_empty() {
                return Ok(Bytes::new());
            }
            let mut next = self.reads.remove(0);
            if next.len() > sz {
                let rest = next.split_off(sz);
                self.reads.insert(0, rest);
            }
            Ok(next)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_all_default_gathers() {
        let mut transport = Scripted {
            reads: vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cdef")],
            written: Vec::new(),
        };

        assert_eq!(transport.read_all(5).unwrap(), Bytes::from_static(b"abcde"));
        assert_eq!(transport.read(8).unwrap(), Bytes::from_static(b"f"));
        assert_eq!(transport.write(b"ok").unwrap(), 2);
        assert_eq!(transport.written, b"ok");
    }

    #[test]
    fn test_read_all_zero_progress_is_eof() {
        let mut transport = Scripted {
            reads: vec![Bytes::from_static(b"abc")],
            written: Vec::new(),
        };

        let err = transport.read_all(8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Eof);
        assert_eq!(err, Error::Binding(BindingError::Eof));

        let io_err = std::io::Error::from(err);
        assert_eq!(io_err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_lifecycle_errors() {
        let (_bus, mut a, _b, _topic) = transports();

        assert!(!a.is_open());
        assert_eq!(a.read(1).unwrap_err().kind(), ErrorKind::Closed);
        assert_eq!(a.write(b"x").unwrap_err().kind(), ErrorKind::Closed);
        assert_eq!(a.close().unwrap_err().kind(), ErrorKind::AlreadyClosed);

        a.open().unwrap();
        assert!(a.is_open());
        assert_eq!(a.open().unwrap_err().kind(), ErrorKind::AlreadyOpen);

        a.close().unwrap();
        assert!(!a.is_open());
        assert_eq!(a.close().unwrap_err().kind(), ErrorKind::AlreadyClosed);

        // Reopen after close
        a.open().unwrap();
        assert!(a.is_open());
    }

    #[test]
    fn test_round_trip() {
        let (bus, mut a, mut b, topic) = transports();
        a.open().unwrap();
        b.open().unwrap();
        assert_eq!(bus.topic_stats(topic).unwrap().bindings, 2);

        assert_eq!(a.write(b"request").unwrap(), 7);
        a.flush().unwrap();
        assert_eq!(b.read_all(7).unwrap(), Bytes::from_static(b"request"));

        b.write(b"response").unwrap();
        assert_eq!(a.read(64).unwrap(), Bytes::from_static(b"response"));
    }

    #[test]
    fn test_binding_closed_elsewhere() {
        let (_bus, mut a, _b, _topic) = transports();
        a.open().unwrap();

        let binding = a.binding().cloned().unwrap();
        binding.close().unwrap();

        assert!(!a.is_open());
        assert_eq!(a.read(4).unwrap_err().kind(), ErrorKind::Closed);
        assert_eq!(a.close().unwrap_err().kind(), ErrorKind::AlreadyClosed);
        a.open().unwrap();
    }
}
