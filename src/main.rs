//! pollroom server binary.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pollroom::cli::{Cli, Command};
use pollroom::config::ServerConfig;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Start {
        config: None,
        port: None,
        bind: None,
    });

    match command {
        Command::Start { config, port, bind } => {
            let mut server_config = match ServerConfig::load(config.as_deref()) {
                Ok(config) => config,
                Err(err) => {
                    tracing::error!(%err, "failed to load configuration");
                    std::process::exit(1);
                }
            };
            if let Some(port) = port {
                server_config.port = port;
            }
            if let Some(bind) = bind {
                server_config.bind = bind;
            }
            if let Err(err) = pollroom::server::serve(server_config).await {
                tracing::error!(%err, "server exited with error");
                std::process::exit(2);
            }
        }
        Command::Version => {
            println!("pollroom {}", env!("CARGO_PKG_VERSION"));
        }
    }
}
