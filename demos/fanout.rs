//! One publisher, many subscribers
//!
//! Run with: cargo run --example fanout [SUBSCRIBERS]
//!
//! The publisher targets the "viewer" kind. Every viewer on the topic gets
//! each chunk; an "auditor" on the same topic with a different kind gets
//! nothing.

use std::sync::Arc;

use handle_bus::{Bus, DeliveryMode};

const MESSAGES: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscribers: usize = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 3,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("handle_bus=debug".parse()?),
        )
        .init();

    let bus = Arc::new(Bus::new());
    let publishers = bus.create_user_kind();
    let viewers = bus.create_user_kind();
    let auditors = bus.create_user_kind();
    let topic = bus.create_topic();

    let source = bus.open(bus.create_user(publishers)?, topic, viewers, 256, 256)?;

    let mut tasks = Vec::with_capacity(subscribers);
    for i in 0..subscribers {
        let viewer = bus.open(bus.create_user(viewers)?, topic, publishers, 64, 64)?;
        tasks.push(tokio::spawn(async move {
            let mut received = Vec::new();
            while received.len() < MESSAGES {
                let chunk = viewer.read_async(64).await?;
                // Messages are newline-terminated; several may arrive in one read
                for line in chunk.split(|b| *b == b'\n').filter(|l| !l.is_empty()) {
                    received.push(String::from_utf8_lossy(line).into_owned());
                }
            }
            println!("viewer {} got {:?}", i, received);
            viewer.close()?;
            Ok::<_, handle_bus::Error>(received.len())
        }));
    }

    let auditor = bus.open_with(
        bus.binding_options(bus.create_user(auditors)?, topic, publishers)
            .delivery(DeliveryMode::Multicast),
    )?;

    for n in 0..MESSAGES {
        source.write(format!("frame {}\n", n).as_bytes())?;
    }

    for task in tasks {
        task.await??;
    }

    println!("auditor got {:?}", auditor.try_read(64)?);
    if let Some(stats) = bus.topic_stats(topic) {
        println!(
            "topic {}: {} chunk(s) published, {} deliveries",
            topic, stats.chunks_published, stats.deliveries
        );
    }

    auditor.close()?;
    source.close()?;
    println!("{:?}", bus.registry_stats());
    Ok(())
}
