use std::sync::Arc;

use mc_client::Connection;
use mc_data::{BlockRegistry, PacketNameRegistry};
use rand::Rng as _;
use tracing::info;

fn generate_bot_name() -> String {
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
    format!("Bot{suffix}")
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mc_client=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let host = args.get(1).cloned().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(25565);
    let name = args.get(3).cloned().unwrap_or_else(generate_bot_name);
    let blocks_path = args
        .get(4)
        .cloned()
        .unwrap_or_else(|| "./data/blocks.json".to_string());
    let packets_path = args
        .get(5)
        .cloned()
        .unwrap_or_else(|| "./data/packets.json".to_string());

    info!(host = %host, port, name = %name, "connecting");

    let registry = Arc::new(BlockRegistry::load(&blocks_path)?);
    let packet_names = Arc::new(PacketNameRegistry::load(&packets_path)?);

    let connection = Connection::connect(host, port, name, registry, packet_names).await?;
    connection.run().await?;

    Ok(())
}
