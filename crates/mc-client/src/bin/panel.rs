//! A tiny HTTP control panel: serves one static page plus a JSON endpoint
//! reporting connected bots. This binary owns no game connections of its
//! own (the original `panel.py` it is modeled on is a pure monitoring
//! front end, never a `CraftPlayer`); `/api/players` always reports an
//! empty list until something wires a real bot registry through it.

use axum::routing::get;
use axum::{Json, Router};
use mc_client::PlayerSnapshot;
use tower_http::services::ServeDir;
use tracing::info;

async fn list_players() -> Json<Vec<PlayerSnapshot>> {
    Json(Vec::new())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mc_client_panel=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let bind_addr = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "0.0.0.0:8080".to_string());

    let app = Router::new()
        .route("/api/players", get(list_players))
        .fallback_service(ServeDir::new("static"));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(bind_addr = %bind_addr, "control panel listening");
    axum::serve(listener, app).await?;

    Ok(())
}
