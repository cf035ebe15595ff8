//! Supervised WebSocket client example.
//!
//! This example keeps a connection to a WebSocket RPC endpoint alive,
//! printing lifecycle events and any frames the server sends.
//!
//! Run against any WebSocket server, e.g. a local node on the default port:
//! cargo run --example ws_client -- ws://localhost:8080/ws
//!
//! Stop and restart the server to watch the supervisor reconnect.

use std::time::Duration;

use rpc_supervisor::transport::WsConnector;
use rpc_supervisor::{ConnectionSupervisor, RetryPolicy, SupervisorConfig};
use tracing_subscriber::EnvFilter;

const REQUEST: &str = r#"{"jsonrpc":"2.0","method":"system_getNodeInfo","params":{},"id":1}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config =
        SupervisorConfig::new().with_retry_policy(RetryPolicy::fixed(5, Duration::from_secs(2)));
    if let Some(address) = std::env::args().nth(1) {
        config = config.with_endpoint(address);
    }

    let supervisor = ConnectionSupervisor::with_tracing(config, WsConnector::new());
    println!("Supervising {}", supervisor.address());

    supervisor.set_on_connected(|handle| {
        let handle = handle.clone();
        async move {
            println!("Connected to {}", handle.address());
            if let Err(e) = handle.send_text(REQUEST).await {
                println!("Request failed: {e}");
                return;
            }
            while let Some(frame) = handle.recv().await {
                println!("Received: {frame}");
            }
        }
    });
    supervisor.set_on_disconnected(|| async { println!("Connection lost") });

    let (closed_tx, mut closed_rx) = tokio::sync::mpsc::unbounded_channel();
    supervisor.set_on_closed(move |error| {
        let _ = closed_tx.send(());
        async move {
            match error {
                Some(e) => println!("Supervisor gave up: {e}"),
                None => println!("Supervisor closed"),
            }
        }
    });

    supervisor.connect(false).await?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
            supervisor.close(None).await;
        }
        _ = closed_rx.recv() => {}
    }

    let stats = supervisor.stats();
    println!(
        "Done! connects={}, failures={}, reconnects={}",
        stats.connect_count, stats.failure_count, stats.reconnect_count
    );
    Ok(())
}
