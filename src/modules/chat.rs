//! The message pipeline: every inbound command or free-text message gets
//! exactly one reply and exactly one journal row, whatever the upstream
//! services do in between.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::Local;
use teloxide::dispatching::HandlerExt;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, User};
use teloxide::utils::command::BotCommands;
use teloxide::utils::html;

use crate::common::{BotEnv, UpdateHandler};
use crate::journal::{Action, InteractionRecord};
use crate::services::{gpt, iam, UpstreamError};
use crate::utils::{BotExt, ResultExt};

/// Prompt sent to the model on `/joke`.
const JOKE_PROMPT: &str = "Tell me a short joke.";

// Replies when the token exchange or the completion call fails.
const JOKE_UNAVAILABLE: &str = "could not fetch joke";
const ANSWER_UNAVAILABLE: &str = "could not process request";

// Replies when the completion succeeds but carries no answer text.
// Deliberately distinct per command.
const JOKE_MISSING_ANSWER: &str = "could not tell a joke";
const ANSWER_MISSING_ANSWER: &str = "answer not received";

/// Sticker sent along with the `/start` greeting.
const WELCOME_STICKER: &str =
    "CAACAgIAAxkBAAMgaAQSmFjk_8_YuLwz6hUVsvPPiKIAAphNAAKJsilJ5BhCB1jHD1g2BA";

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
pub enum Command {
    #[command(description = "start the conversation.")]
    Start,
    #[command(description = "display this text.")]
    Help,
    #[command(description = "tell a joke.")]
    Joke,
}

pub fn command_handler() -> UpdateHandler {
    dptree::entry().filter_command::<Command>().endpoint(handle_command)
}

/// Free text goes to the model.  Unknown `/commands` are dropped
/// unanswered and unlogged.
pub fn message_handler() -> UpdateHandler {
    dptree::filter_map(|msg: Message| {
        msg.text()
            .filter(|text| !text.starts_with('/'))
            .map(ToOwned::to_owned)
    })
    .endpoint(handle_text)
}

async fn handle_command(
    bot: Bot,
    env: Arc<BotEnv>,
    msg: Message,
    command: Command,
) -> Result<()> {
    let started_at = Local::now();
    let started = Instant::now();
    let Some(user) = msg.from.clone() else {
        // Channel posts carry no sender to attribute the journal row to.
        return Ok(());
    };

    match command {
        Command::Start => {
            log::info!("/start from {}", user.id);
            let greeting = greeting(&user);
            let sent = bot
                .reply_message(&msg, &greeting)
                .parse_mode(ParseMode::Html)
                .await;
            let record = InteractionRecord::new(
                user.id,
                started_at,
                Action::Start,
                0,
                text_len(&greeting),
                started.elapsed(),
            );
            if sent.is_ok() {
                bot.send_sticker(
                    msg.chat.id,
                    InputFile::file_id(WELCOME_STICKER.to_owned()),
                )
                .await
                .warn_on_error("failed to send the welcome sticker");
            }
            env.journal.append(&record);
            sent?;
        }
        Command::Help => {
            log::info!("/help from {}", user.id);
            let text = Command::descriptions().to_string();
            let sent = bot.reply_message(&msg, &text).await;
            env.journal.append(&InteractionRecord::new(
                user.id,
                started_at,
                Action::Help,
                0,
                text_len(&text),
                started.elapsed(),
            ));
            sent?;
        }
        Command::Joke => {
            log::info!("/joke from {}", user.id);
            let text = ask_model(
                &env,
                JOKE_PROMPT,
                JOKE_MISSING_ANSWER,
                JOKE_UNAVAILABLE,
            )
            .await;
            let sent = bot.reply_message(&msg, &text).await;
            env.journal.append(&InteractionRecord::new(
                user.id,
                started_at,
                Action::Joke,
                text_len(JOKE_PROMPT),
                text_len(&text),
                started.elapsed(),
            ));
            sent?;
        }
    }
    Ok(())
}

async fn handle_text(
    bot: Bot,
    env: Arc<BotEnv>,
    msg: Message,
    text: String,
) -> Result<()> {
    let started_at = Local::now();
    let started = Instant::now();
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    log::info!("message from {}, {} chars", user.id, text_len(&text));

    let answer =
        ask_model(&env, &text, ANSWER_MISSING_ANSWER, ANSWER_UNAVAILABLE)
            .await;
    let sent = bot.reply_message(&msg, &answer).await;
    env.journal.append(&InteractionRecord::new(
        user.id,
        started_at,
        Action::Answer,
        text_len(&text),
        text_len(&answer),
        started.elapsed(),
    ));
    sent?;
    Ok(())
}

/// Fresh token, one completion call, one recovery branch: any upstream
/// failure turns into the fixed `unavailable` reply.
async fn ask_model(
    env: &BotEnv,
    prompt: &str,
    missing_answer: &str,
    unavailable: &str,
) -> String {
    match try_ask_model(env, prompt, missing_answer).await {
        Ok(answer) => answer,
        Err(e) => {
            log::error!("completion pipeline failed: {e}");
            unavailable.to_string()
        }
    }
}

async fn try_ask_model(
    env: &BotEnv,
    prompt: &str,
    missing_answer: &str,
) -> Result<String, UpstreamError> {
    let iam_token = iam::issue_token(&env.http, &env.config.oauth_token).await?;
    gpt::complete(
        &env.http,
        &env.config.folder_id,
        &iam_token,
        prompt,
        missing_answer,
    )
    .await
}

fn greeting(user: &User) -> String {
    format!(
        "Hi, {}! I am a chat bot built on top of YandexGPT \u{1f9d0}\n\n\
         Ask me anything and I will try my best to answer!",
        mention(user),
    )
}

fn mention(user: &User) -> String {
    format!(
        "<a href=\"tg://user?id={}\">{}</a>",
        user.id,
        html::escape(&user.first_name),
    )
}

fn text_len(text: &str) -> u64 {
    text.chars().count() as u64
}

#[cfg(test)]
mod tests {
    use teloxide::types::UserId;

    use super::*;

    #[test]
    fn fallback_strings_stay_distinct_per_call_site() {
        assert_ne!(JOKE_UNAVAILABLE, ANSWER_UNAVAILABLE);
        assert_ne!(JOKE_MISSING_ANSWER, ANSWER_MISSING_ANSWER);
    }

    #[test]
    fn greeting_mentions_the_user_and_escapes_the_name() {
        let user = User {
            id: UserId(42),
            is_bot: false,
            first_name: "Alice <3".to_string(),
            last_name: None,
            username: None,
            language_code: None,
            is_premium: false,
            added_to_attachment_menu: false,
        };
        let text = greeting(&user);
        assert!(text.contains("<a href=\"tg://user?id=42\">Alice &lt;3</a>"));
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        assert_eq!(text_len("привет"), 6);
    }
}
