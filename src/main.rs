#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::pedantic)]
// False positives
#![allow(clippy::needless_pass_by_value)] // for dptree handlers

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;
use teloxide::dispatching::{Dispatcher, UpdateFilterExt};
use teloxide::dptree;
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::types::Update;
use teloxide::Bot;

mod common;
mod config;
mod export;
mod journal;
mod modules;
mod services;
mod utils;

/// Interaction journal kept next to the binary.
static JOURNAL_FILENAME: &str = "data/data.csv";
/// Spreadsheet rendered from the journal during export.
static SPREADSHEET_FILENAME: &str = "data/data.xlsx";

/// yabot
#[derive(FromArgs, PartialEq, Debug)]
struct Args {
    #[argh(subcommand)]
    subcommand: SubCommand,
}

#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand)]
enum SubCommand {
    Bot(SubCommandBot),
    Export(SubCommandExport),
}

/// run the bot
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "bot")]
struct SubCommandBot {}

/// convert the journal to a spreadsheet and upload it to Disk
#[derive(FromArgs, PartialEq, Debug)]
#[argh(subcommand, name = "export")]
struct SubCommandExport {}

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();
    dotenvy::dotenv().ok();

    let args: Args = argh::from_env();
    match args.subcommand {
        SubCommand::Bot(_) => run_bot().await,
        SubCommand::Export(_) => run_export().await,
    }
}

async fn run_bot() -> Result<()> {
    let env = Arc::new(common::BotEnv {
        config: config::Config::from_env()?,
        http: http_client()?,
        journal: journal::Journal::new(JOURNAL_FILENAME),
    });

    log::info!("starting the bot...");
    let bot = Bot::new(&env.config.bot_token);

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .branch(modules::chat::command_handler())
            .branch(modules::chat::message_handler())
            .endpoint(drop_endpoint),
    )
    .dependencies(dptree::deps![Arc::clone(&env)])
    .default_handler(|update| async move {
        log::debug!("unhandled update: {update:?}");
    })
    .error_handler(LoggingErrorHandler::with_custom_text(
        "error in the message handler",
    ))
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

async fn run_export() -> Result<()> {
    let config = config::Config::from_env()?;
    export::run(&config, http_client()?).await?;
    Ok(())
}

fn http_client() -> Result<reqwest::Client> {
    // A hung upstream must not stall the event loop forever.
    Ok(reqwest::ClientBuilder::new()
        .timeout(Duration::from_secs(30))
        .build()?)
}

async fn drop_endpoint() -> Result<()> {
    Ok(())
}
