use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "transcript-api",
    about = "HTTP service serving YouTube transcripts with caption fallbacks",
    version
)]
pub struct Cli {
    /// Address to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Config file (defaults to ~/.config/transcript-api/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write logs to the log file instead of stderr
    #[arg(long)]
    pub log_file: bool,

    /// Show effective configuration on startup
    #[arg(short, long)]
    pub verbose: bool,
}
