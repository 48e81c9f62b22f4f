mod ai;
mod auth;
mod config;
mod error;
mod http;
mod metrics;
mod probes;
mod snapshot;

use ai::AiClient;
use auth::TokenStore;
use axum::serve;
use clap::Parser;
use config::Config;
use http::HttpAppState;
use metrics::Metrics;
use probes::Probes;
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "netprobed")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "./config.yaml")]
    config: String,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match Config::load_from_file(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            error!(error = %err, "failed to load configuration");
            std::process::exit(1);
        }
    };

    info!(
        listen = %cfg.listen,
        roster = cfg.roster.len(),
        ai_enabled = cfg.ai.enabled,
        "starting netprobed"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "failed to initialize metrics");
            std::process::exit(1);
        }
    };

    let client = Client::builder()
        .user_agent("netprobed/0.1.0")
        .build()
        .unwrap_or_else(|_| Client::new());

    let probes = Arc::new(Probes::from_config(&cfg, client.clone()));
    let tokens = Arc::new(TokenStore::new(&cfg.auth));
    let ai = AiClient::from_config(client, &cfg.ai).map(Arc::new);

    let app = http::build_router(HttpAppState {
        metrics,
        probes,
        tokens,
        ai,
    });

    let addr: SocketAddr = match cfg.listen.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(error = %err, listen = %cfg.listen, "invalid listen address");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(err) => {
            error!(error = %err, "failed to start HTTP server");
            std::process::exit(1);
        }
    };

    let server = serve(listener, app).with_graceful_shutdown(shutdown_signal());
    if let Err(err) = server.await {
        error!(error = %err, "HTTP server error");
    }
    info!("shutdown complete");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
        return;
    }
    info!("received Ctrl+C, shutting down");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
