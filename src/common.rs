//! Shared state for the bot handlers.

use crate::config::Config;
use crate::journal::Journal;

/// Wrapper around [`teloxide::dispatching::UpdateHandler`] to be used in
/// this crate.
pub type UpdateHandler = teloxide::dispatching::UpdateHandler<anyhow::Error>;

/// Bot environment: global state shared between all handlers.
pub struct BotEnv {
    pub config: Config,
    pub http: reqwest::Client,
    pub journal: Journal,
}
