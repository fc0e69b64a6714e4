use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vss_bridge::{IngestCounters, ListenerConfig, VssBridge};
use vss_core::{MemoryPropertyStore, PropertyConfig, SignalMap, StaticSignalMap};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,vss_bridge=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("VSS telemetry bridge starting...");

    // Configuration from environment
    let feed_port: u16 = env_or("VSS_BRIDGE_PORT", 33452)?;
    let http_port: u16 = env_or("VSS_HTTP_PORT", 33462)?;

    let map = load_signal_map()?;
    tracing::info!("signal mapping table loaded: {} entries", map.mapping_count());

    // Register property configs from the mapping table so the store can
    // reject kind-mismatched updates
    let store = Arc::new(MemoryPropertyStore::new());
    for (_, mapping) in map.entries() {
        store.register_config(PropertyConfig {
            property_id: mapping.property_id,
            kind: mapping.kind,
        });
    }

    let config = ListenerConfig {
        bind_addr: SocketAddr::from(([0, 0, 0, 0], feed_port)),
        ..ListenerConfig::default()
    };

    let bridge = VssBridge::new(config, Arc::new(map), store.clone());
    bridge
        .initialize()
        .await
        .context("failed to initialize telemetry bridge")?;

    let counters = bridge.counters();
    let http_addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let http_handle = tokio::spawn(async move {
        if let Err(e) = start_http_server(http_addr, store, counters).await {
            tracing::error!("diagnostics HTTP server error: {}", e);
        }
    });

    tracing::info!("VSS bridge ready");
    tracing::info!("   Telemetry feed: tcp://0.0.0.0:{}", feed_port);
    tracing::info!("   Diagnostics:    http://localhost:{}/stats", http_port);
    tracing::info!("");
    tracing::info!("Try these commands:");
    tracing::info!("   printf 'Vehicle.Speed=42.5\\n' | nc localhost {}", feed_port);
    tracing::info!("   curl http://localhost:{}/stats", http_port);
    tracing::info!("   curl http://localhost:{}/properties", http_port);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = http_handle => {
            tracing::warn!("diagnostics HTTP server stopped");
        }
    }

    bridge.shutdown().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Read a numeric setting from the environment with a default.
fn env_or(key: &str, default: u16) -> anyhow::Result<u16> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u16>()
            .with_context(|| format!("invalid {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

/// Load the signal mapping from VSS_MAPPING_FILE, or fall back to the
/// builtin table.
fn load_signal_map() -> anyhow::Result<StaticSignalMap> {
    match std::env::var("VSS_MAPPING_FILE") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read mapping file {}", path))?;
            StaticSignalMap::from_json_str(&json)
                .with_context(|| format!("failed to parse mapping file {}", path))
        }
        Err(_) => Ok(StaticSignalMap::builtin()),
    }
}

type DiagState = (Arc<MemoryPropertyStore>, Arc<IngestCounters>);

/// Start the read-only diagnostics HTTP server.
async fn start_http_server(
    addr: SocketAddr,
    store: Arc<MemoryPropertyStore>,
    counters: Arc<IngestCounters>,
) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/stats", get(stats_handler))
        .route("/properties", get(properties_handler))
        .route("/properties/:id", get(property_handler))
        .with_state((store, counters));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("diagnostics HTTP server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Counter snapshot handler.
async fn stats_handler(State((_, counters)): State<DiagState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(counters.snapshot()))
}

/// Full store dump handler.
async fn properties_handler(State((store, _)): State<DiagState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(store.all_properties()))
}

/// Single property handler; returns every area of the property.
async fn property_handler(
    Path(id): Path<i32>,
    State((store, _)): State<DiagState>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let matching: Vec<_> = store
        .all_properties()
        .into_iter()
        .filter(|u| u.property_id == id)
        .collect();

    if matching.is_empty() {
        Err(StatusCode::NOT_FOUND)
    } else {
        Ok(Json(serde_json::json!(matching)))
    }
}
