use clap::Parser;
use f1_tcs::Server;
use f1_tcs::config::{Config, SIMULATOR_ENV, simulator_enabled};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Address for the HTTP API, overriding `server.listen`.
    #[arg(long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_path(&args.config)?;

    let simulator = simulator_enabled();
    if simulator {
        tracing::warn!("{SIMULATOR_ENV} is set, talking to the line-protocol simulator");
    }

    let server = Server {
        listen_addr: args.listen.unwrap_or(config.server.listen),
        exclusive_sequences: config.server.exclusive_sequences,
        ..Server::new(config.endpoints(simulator)?)
    };

    server.bind().await?.start().await
}
