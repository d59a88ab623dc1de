//! Launches several bots against the same server concurrently, each with its
//! own connection and generated name. Rust equivalent of the reference
//! client's `asyncio.gather` over a list of agents: one `tokio::task` per
//! bot, joined at the end so a single failing connection doesn't silently
//! vanish.

use std::sync::Arc;

use mc_client::Connection;
use mc_data::{BlockRegistry, PacketNameRegistry};
use rand::Rng as _;
use tokio::task::JoinSet;
use tracing::{error, info};

fn generate_bot_name(index: usize) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| {
            let c: u8 = rng.gen_range(0..36);
            if c < 10 {
                (b'0' + c) as char
            } else {
                (b'A' + c - 10) as char
            }
        })
        .collect();
    format!("Bot{index}{suffix}")
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mc_client_swarm=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let host = args.get(1).cloned().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(25565);
    let count: usize = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(5);
    let blocks_path = args
        .get(4)
        .cloned()
        .unwrap_or_else(|| "./data/blocks.json".to_string());
    let packets_path = args
        .get(5)
        .cloned()
        .unwrap_or_else(|| "./data/packets.json".to_string());

    info!(host = %host, port, count, "spawning swarm");

    let registry = Arc::new(BlockRegistry::load(&blocks_path)?);
    let packet_names = Arc::new(PacketNameRegistry::load(&packets_path)?);

    let mut tasks = JoinSet::new();
    for i in 0..count {
        let host = host.clone();
        let registry = Arc::clone(&registry);
        let packet_names = Arc::clone(&packet_names);
        let name = generate_bot_name(i);

        tasks.spawn(async move {
            let outcome = async {
                let connection =
                    Connection::connect(host, port, name.clone(), registry, packet_names).await?;
                connection.run().await
            }
            .await;

            if let Err(e) = &outcome {
                error!(bot = %name, error = %e, "bot connection failed");
            }
            outcome
        });
    }

    while let Some(result) = tasks.join_next().await {
        result?.ok();
    }

    Ok(())
}
