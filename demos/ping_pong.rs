//! Request/response over the bus between two threads
//!
//! Run with: cargo run --example ping_pong [ROUNDS]
//!
//! A client and a server each hold a `BusTransport` on the same topic with
//! crossed user kinds. Messages are framed with a 4-byte big-endian length so
//! the reader knows how much to `read_all`.
//!
//! Set `RUST_LOG=handle_bus=trace` to see every chunk routed.

use std::sync::Arc;
use std::thread;

use handle_bus::{Bus, BusTransport, ByteTransport, ErrorKind};

fn send_frame(transport: &mut BusTransport, body: &[u8]) -> handle_bus::Result<()> {
    transport.write(&(body.len() as u32).to_be_bytes())?;
    transport.write(body)?;
    transport.flush()
}

fn recv_frame(transport: &mut BusTransport) -> handle_bus::Result<Vec<u8>> {
    let len = transport.read_all(4)?;
    let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
    Ok(transport.read_all(len)?.to_vec())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rounds: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 3,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("handle_bus=info".parse()?),
        )
        .init();

    let bus = Arc::new(Bus::new());
    let clients = bus.create_user_kind();
    let servers = bus.create_user_kind();
    let client = bus.create_user(clients)?;
    let server = bus.create_user(servers)?;
    let topic = bus.create_topic();

    let mut server_side =
        BusTransport::connect(Arc::clone(&bus), bus.binding_options(server, topic, clients))?;
    let mut client_side =
        BusTransport::connect(Arc::clone(&bus), bus.binding_options(client, topic, servers))?;

    // The client closes its side when done; the server then sees Closed
    let server_binding = server_side.binding().cloned();

    let responder = thread::spawn(move || -> handle_bus::Result<usize> {
        let mut served = 0;
        loop {
            match recv_frame(&mut server_side) {
                Ok(request) => {
                    let text = String::from_utf8_lossy(&request);
                    let reply = text.replace("ping", "pong");
                    send_frame(&mut server_side, reply.as_bytes())?;
                    served += 1;
                }
                Err(err) if err.kind() == ErrorKind::Closed => return Ok(served),
                Err(err) => return Err(err),
            }
        }
    });

    for round in 0..rounds {
        let request = format!("ping #{}", round);
        send_frame(&mut client_side, request.as_bytes())?;
        let reply = recv_frame(&mut client_side)?;
        println!("{} -> {}", request, String::from_utf8_lossy(&reply));
    }

    client_side.close()?;
    if let Some(binding) = server_binding {
        binding.close()?;
    }

    let served = responder
        .join()
        .map_err(|_| "responder thread panicked")??;
    println!("Server answered {} request(s)", served);

    bus.destroy_user(client)?;
    bus.destroy_user(server)?;
    bus.destroy_user_kind(clients)?;
    bus.destroy_user_kind(servers)?;
    bus.destroy_topic(topic)?;

    let stats = bus.registry_stats();
    println!("Live objects after teardown: {}", stats.live_objects());
    Ok(())
}
