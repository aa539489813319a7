//! Small helpers shared by the bot modules.

use teloxide::payloads;
use teloxide::prelude::*;
use teloxide::requests::JsonRequest;
use teloxide::types::ReplyParameters;

/// Log-and-continue for best-effort side effects whose failure must not
/// interrupt the surrounding flow.
pub trait ResultExt<T> {
    fn warn_on_error(self, msg: &str) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn warn_on_error(self, msg: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("{msg}: {e}");
                None
            }
        }
    }
}

pub trait BotExt {
    fn reply_message<T: Into<String>>(
        &self,
        msg: &Message,
        text: T,
    ) -> JsonRequest<payloads::SendMessage>;
}

impl BotExt for Bot {
    fn reply_message<T: Into<String>>(
        &self,
        msg: &Message,
        text: T,
    ) -> JsonRequest<payloads::SendMessage> {
        self.send_message(msg.chat.id, text)
            .reply_parameters(ReplyParameters::new(msg.id))
    }
}
