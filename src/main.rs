use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Result, WrapErr};
use log::{debug, info};

mod cli;

use cli::Cli;
use transcript_api::config::{self, Config};
use transcript_api::resolver::Resolver;
use transcript_api::server::{self, AppState};
use transcript_api::youtube::YoutubeClient;

fn setup_logging(to_file: bool) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if to_file {
        let log_dir = log_dir();
        std::fs::create_dir_all(&log_dir)?;
        let log_file = log_dir.join("transcript-api.log");
        let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);
        builder.target(env_logger::Target::Pipe(target));
        builder.init();
        info!("Logging initialized: {}", log_file.display());
    } else {
        builder.init();
    }

    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("transcript-api")
        .join("logs")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_file)?;

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let mut config = Config::load_from(&config_path)
        .wrap_err_with(|| format!("failed to load config from {}", config_path.display()))?;

    // CLI flags take priority over the config file
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    if cli.verbose {
        info!("Config: {}", config_path.display());
        info!("Preferred languages: {:?}", config.preferred_languages);
        info!("Fallback languages: {:?}", config.fallback_languages);
        info!("Timed-text hosts: {:?}", config.endpoints.timedtext_hosts);
    }
    debug!("Effective config: {config:?}");

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .wrap_err_with(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    let client = Arc::new(YoutubeClient::new(&config)?);
    let resolver = Resolver::from_config(client, &config);
    info!("Resolution chain: {:?}", resolver.methods());

    server::serve(addr, AppState::new(resolver)).await
}
