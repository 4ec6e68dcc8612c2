use std::net::SocketAddr;
use std::sync::Arc;

use unilink_rs::http;
use unilink_rs::{MemoryStore, ServiceConfig, Unilink};

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = ServiceConfig::from_env();
    if let Some(bind) = parse_arg("--bind") {
        config.bind = bind;
    }
    if let Some(retries) = parse_arg("--tx-retries") {
        config.max_tx_retries = retries.parse()?;
    }

    let addr: SocketAddr = config.bind.parse()?;
    let service = Arc::new(Unilink::with_store_and_config(MemoryStore::new(), &config));
    let app = http::router(service);

    tracing::info!(%addr, retries = config.max_tx_retries, "unilink listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
