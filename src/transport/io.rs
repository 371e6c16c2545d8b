//! `std::io` adapters for [`BusTransport`]

use std::io;

use super::adapter::{BusTransport, ByteTransport};

impl io::Read for BusTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let data = ByteTransport::read(self, buf.len())?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }
}

impl io::Write for BusTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ByteTransport::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(ByteTransport::flush(self)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::sync::Arc;

    use crate::bus::{Bus, BusConfig};
    use crate::transport::BusTransport;

    #[test]
    fn test_io_round_trip() {
        let bus = Arc::new(Bus::new());
        let kind = bus.create_user_kind();
        let left = bus.create_user(kind).unwrap();
        let right = bus.create_user(kind).unwrap();
        let topic = bus.create_topic();

        let mut a = BusTransport::connect(
            Arc::clone(&bus),
            bus.binding_options(left, topic, kind),
        )
        .unwrap();
        let mut b = BusTransport::connect(
            Arc::clone(&bus),
            bus.binding_options(right, topic, kind),
        )
        .unwrap();

        a.write_all(b"peer to peer").unwrap();
        a.flush().unwrap();

        let mut buf = [0u8; 12];
        b.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"peer to peer");
    }

    #[test]
    fn test_io_error_kinds() {
        let bus = Arc::new(Bus::new());
        let kind = bus.create_user_kind();
        let user = bus.create_user(kind).unwrap();
        let topic = bus.create_topic();

        let mut transport = BusTransport::new(
            Arc::clone(&bus),
            bus.binding_options(user, topic, kind),
        );

        let err = transport.write(b"x").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);

        let mut buf = [0u8; 4];
        let err = transport.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotConnected);
        assert_eq!(transport.read(&mut []).unwrap(), 0);
    }

    #[test]
    fn test_buffered_reader_under_chunk_cap() {
        let bus = Arc::new(Bus::with_config(BusConfig::default().max_chunk_capacity(1024)));
        let kind = bus.create_user_kind();
        let left = bus.create_user(kind).unwrap();
        let right = bus.create_user(kind).unwrap();
        let topic = bus.create_topic();

        let mut writer = BusTransport::connect(
            Arc::clone(&bus),
            bus.binding_options(left, topic, kind).capacities(64, 64),
        )
        .unwrap();
        let reader = BusTransport::connect(
            Arc::clone(&bus),
            bus.binding_options(right, topic, kind).capacities(64, 64),
        )
        .unwrap();

        writer.write_all(b"first line\nsecond").unwrap();
        writer.write_all(b" line\n").unwrap();

        // BufReader asks for 8 KiB at a time, well past the cap
        let mut reader = BufReader::new(reader);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "first line\n");

        line.clear();
        reader.read_line(&mut line).unwrap();
        assert_eq!(line, "second line\n");
    }
}
