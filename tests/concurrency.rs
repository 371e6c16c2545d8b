//! Cross-thread behavior: blocking reads, close, shutdown and writer ordering

use std::io::{Read, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use handle_bus::{Bus, BusTransport, ByteTransport, ClientBinding, ErrorKind};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pair(bus: &Arc<Bus>) -> (ClientBinding, ClientBinding) {
    let a = bus.create_user_kind();
    let b = bus.create_user_kind();
    let t = bus.create_topic();
    let left = bus.open(bus.create_user(a).unwrap(), t, b, 64, 64).unwrap();
    let right = bus.open(bus.create_user(b).unwrap(), t, a, 64, 64).unwrap();
    (left, right)
}

#[test]
fn test_blocked_read_wakes_on_write() {
    let bus = Arc::new(Bus::new());
    let (left, right) = pair(&bus);

    let reader = thread::spawn(move || right.read(16));
    thread::sleep(Duration::from_millis(20));
    left.write(b"wake").unwrap();

    assert_eq!(&reader.join().unwrap().unwrap()[..], b"wake");
}

#[test]
fn test_close_releases_blocked_reader() {
    init_tracing();
    let bus = Arc::new(Bus::new());
    let (_left, right) = pair(&bus);

    let (started_tx, started_rx) = mpsc::channel();
    let reader = {
        let right = right.clone();
        thread::spawn(move || {
            started_tx.send(()).unwrap();
            right.read(16)
        })
    };

    started_rx.recv().unwrap();
    thread::sleep(Duration::from_millis(20));
    right.close().unwrap();

    let err = reader.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    assert_eq!(bus.registry_stats().bindings, 1);
    assert_eq!(right.read_capacity(), 0);
}

#[test]
fn test_close_racing_reader_leaves_nothing_held() {
    const ROUNDS: usize = 1000;

    let bus = Arc::new(Bus::new());
    let a = bus.create_user_kind();
    let b = bus.create_user_kind();
    let t = bus.create_topic();
    let sender = bus.open(bus.create_user(a).unwrap(), t, b, 16, 16).unwrap();
    let user = bus.create_user(b).unwrap();

    let mut leaked = 0;
    for _ in 0..ROUNDS {
        let binding = bus.open(user, t, a, 4096, 16).unwrap();
        let reader = {
            let binding = binding.clone();
            thread::spawn(move || loop {
                match binding.try_read(4096) {
                    Ok(_) => continue,
                    Err(err) => return err.kind(),
                }
            })
        };

        sender.write(b"data").unwrap();
        binding.close().unwrap();
        assert_eq!(reader.join().unwrap(), ErrorKind::Closed);

        if binding.read_capacity() != 0 {
            leaked += 1;
        }
    }

    assert_eq!(leaked, 0, "closed bindings still holding a read buffer");
    assert_eq!(bus.registry_stats().bindings, 1);
}

#[test]
fn test_shutdown_releases_readers() {
    init_tracing();
    let bus = Arc::new(Bus::new());
    let (left, right) = pair(&bus);

    let readers: Vec<_> = [left.clone(), right.clone()]
        .into_iter()
        .map(|binding| thread::spawn(move || binding.read(8)))
        .collect();
    thread::sleep(Duration::from_millis(20));

    bus.shutdown();

    for reader in readers {
        let err = reader.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Closed);
    }

    left.close().unwrap();
    right.close().unwrap();
    assert_eq!(bus.registry_stats().bindings, 0);
}

#[test]
fn test_concurrent_writers_keep_fifo() {
    init_tracing();
    const WRITERS: u8 = 4;
    const MESSAGES: u32 = 200;

    let bus = Arc::new(Bus::new());
    let producers = bus.create_user_kind();
    let consumers = bus.create_user_kind();
    let t = bus.create_topic();

    let reader = bus
        .open(bus.create_user(consumers).unwrap(), t, producers, 64, 64)
        .unwrap();

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let binding = bus
                .open(bus.create_user(producers).unwrap(), t, consumers, 8, 8)
                .unwrap();
            thread::spawn(move || {
                for seq in 0..MESSAGES {
                    let mut frame = [0u8; 5];
                    frame[0] = w;
                    frame[1..].copy_from_slice(&seq.to_be_bytes());
                    binding.write(&frame).unwrap();
                }
            })
        })
        .collect();

    for writer in writers {
        writer.join().unwrap();
    }

    let total = WRITERS as usize * MESSAGES as usize * 5;
    let data = reader.read_all(total).unwrap();

    let mut next = [0u32; WRITERS as usize];
    for frame in data.chunks(5) {
        let w = frame[0] as usize;
        let seq = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        assert_eq!(seq, next[w], "writer {} out of order", w);
        next[w] += 1;
    }
    assert!(next.iter().all(|&n| n == MESSAGES));
}

#[test]
fn test_async_reader_on_blocking_thread() {
    let bus = Arc::new(Bus::new());
    let (left, right) = pair(&bus);

    let reader = thread::spawn(move || tokio_test::block_on(right.read_all_async(6)));
    left.write(b"abc").unwrap();
    left.write(b"def").unwrap();

    assert_eq!(&reader.join().unwrap().unwrap()[..], b"abcdef");
}

#[test]
fn test_request_response_over_io() {
    init_tracing();
    let bus = Arc::new(Bus::new());
    let clients = bus.create_user_kind();
    let servers = bus.create_user_kind();
    let client = bus.create_user(clients).unwrap();
    let server = bus.create_user(servers).unwrap();
    let t = bus.create_topic();

    let mut server_side =
        BusTransport::connect(Arc::clone(&bus), bus.binding_options(server, t, clients)).unwrap();
    let mut client_side =
        BusTransport::connect(Arc::clone(&bus), bus.binding_options(client, t, servers)).unwrap();

    let responder = thread::spawn(move || {
        for _ in 0..3 {
            let mut len = [0u8; 4];
            server_side.read_exact(&mut len).unwrap();
            let mut body = vec![0u8; u32::from_be_bytes(len) as usize];
            server_side.read_exact(&mut body).unwrap();

            body.reverse();
            server_side.write_all(&(body.len() as u32).to_be_bytes()).unwrap();
            server_side.write_all(&body).unwrap();
            Write::flush(&mut server_side).unwrap();
        }
        ByteTransport::close(&mut server_side).unwrap();
    });

    for request in [&b"one"[..], b"second", b"the third request"] {
        client_side
            .write_all(&(request.len() as u32).to_be_bytes())
            .unwrap();
        client_side.write_all(request).unwrap();

        let len = ByteTransport::read_all(&mut client_side, 4).unwrap();
        let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
        let body = ByteTransport::read_all(&mut client_side, len).unwrap();

        let mut expected = request.to_vec();
        expected.reverse();
        assert_eq!(&body[..], &expected[..]);
    }

    responder.join().unwrap();
    ByteTransport::close(&mut client_side).unwrap();
    assert_eq!(bus.registry_stats().bindings, 0);
}
