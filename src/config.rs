//! Process configuration, assembled once at startup from the environment.

use anyhow::{bail, Result};

/// Recognized environment keys: `BOT_TOKEN`, `OAUTH`, `FOLDER_ID` and, for
/// the exporter only, `YA_OAUTH`.  A `.env` file next to the binary is
/// honored; see `.env.example`.
#[derive(Debug)]
pub struct Config {
    /// Telegram bot token (`BOT_TOKEN`).
    pub bot_token: String,
    /// Long-lived Yandex OAuth token, exchanged for IAM tokens (`OAUTH`).
    pub oauth_token: String,
    /// Yandex Cloud folder id used to build the model URI (`FOLDER_ID`).
    pub folder_id: String,
    /// Yandex Disk OAuth token used by the journal exporter (`YA_OAUTH`).
    pub disk_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bot_token: require("BOT_TOKEN")?,
            oauth_token: require("OAUTH")?,
            folder_id: require("FOLDER_ID")?,
            disk_token: std::env::var("YA_OAUTH").ok().filter(|v| !v.is_empty()),
        })
    }
}

fn require(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => bail!("environment variable {key} is not set"),
    }
}
