#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Polaris dashboard server.
//!
//! ```text
//! polaris_server [--config polaris.toml] [--bind-addr 0.0.0.0] [--port 8080]
//! ```
//!
//! Without `--config` the engine runs on defaults. `POLARIS_API_URL`,
//! `BIND_ADDR` and `PORT` are read from the environment when the matching
//! flags are absent.

use std::path::PathBuf;

use clap::Parser;
use polaris_engine::EngineConfig;

#[derive(Parser)]
#[command(name = "polaris_server")]
#[command(about = "Serve the Polaris early-warning dashboard API")]
struct Cli {
    /// Engine config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind (default: `BIND_ADDR` or 127.0.0.1)
    #[arg(long)]
    bind_addr: Option<String>,

    /// Port to listen on (default: `PORT` or 8080)
    #[arg(long)]
    port: Option<u16>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(std::io::Error::other)?,
        None => EngineConfig::default().with_env_overrides(),
    };

    let bind_addr = cli
        .bind_addr
        .or_else(|| std::env::var("BIND_ADDR").ok())
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = cli
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
        .unwrap_or(8080);

    polaris_server::run_server(config, &bind_addr, port).await
}
