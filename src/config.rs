use std::path::{Path, PathBuf};

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Timeout for every outbound call except the mobile page scrape
    pub timeout_secs: u64,
    pub scrape_timeout_secs: u64,
    pub preferred_languages: Vec<String>,
    pub fallback_languages: Vec<String>,
    /// Languages tried against each timed-text host
    pub timedtext_languages: Vec<String>,
    pub endpoints: Endpoints,
}

/// Base URLs of the platform endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub www: String,
    pub mobile: String,
    pub timedtext_hosts: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            timeout_secs: 10,
            scrape_timeout_secs: 15,
            preferred_languages: strings(&["ar", "ar-SA", "ar-EG", "ar-AE"]),
            fallback_languages: strings(&["en", "en-US", "en-GB", "en-CA"]),
            timedtext_languages: strings(&["en", "ar"]),
            endpoints: Endpoints::default(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            www: "https://www.youtube.com".to_string(),
            mobile: "https://m.youtube.com".to_string(),
            timedtext_hosts: strings(&[
                "https://www.youtube.com/api/timedtext",
                "https://video.google.com/timedtext",
            ]),
        }
    }
}

impl Config {
    /// Load config from `path`, falling back to defaults when the file is absent
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("transcript-api")
        .join("config.toml")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
