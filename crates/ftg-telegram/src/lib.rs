//! Telegram adapter (teloxide).
//!
//! This crate implements the `ftg-core` ports over the Telegram Bot API and
//! converts teloxide updates into the core message model.

use async_trait::async_trait;

use teloxide::{prelude::*, types::ParseMode};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use ftg_core::{
    domain::{ChatId, MessageId, MessageRef, UserId},
    errors::Error,
    message::{Contact, Entity, EntityKind, IncomingMessage, Sender},
    messaging::port::MessagingPort,
    ports::{Account, AccountPort},
    Result,
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
            })
            .await?;

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(to.chat_id), html.to_string())
                    .parse_mode(ParseMode::Html)
                    .reply_to_message_id(Self::tg_msg_id(to.message_id))
            })
            .await?;

        Ok(MessageRef {
            chat_id: to.chat_id,
            message_id: MessageId(msg.id.0),
        })
    }

    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .edit_message_text(
                    Self::tg_chat(msg.chat_id),
                    Self::tg_msg_id(msg.message_id),
                    html.to_string(),
                )
                .parse_mode(ParseMode::Html)
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountPort for TelegramMessenger {
    async fn get_me(&self) -> Result<Account> {
        let me = self.with_retry(|| self.bot.get_me()).await?;
        Ok(Account {
            id: tg_user_id(me.user.id),
            username: me.user.username.clone(),
            is_bot: me.user.is_bot,
        })
    }
}

fn tg_user_id(id: teloxide::types::UserId) -> UserId {
    UserId(id.0 as i64)
}

fn sender_from(user: &teloxide::types::User) -> Sender {
    Sender {
        id: tg_user_id(user.id),
        username: user.username.clone(),
        lang_code: user.language_code.clone(),
        // The Bot API never exposes a sender's phone number.
        phone: None,
    }
}

fn entity_from(e: &teloxide::types::MessageEntity) -> Entity {
    use teloxide::types::MessageEntityKind as K;

    let kind = match &e.kind {
        K::Hashtag => EntityKind::Hashtag,
        K::Mention => EntityKind::Mention,
        K::TextMention { user } => EntityKind::TextMention {
            user_id: tg_user_id(user.id),
        },
        _ => EntityKind::Other,
    };
    Entity {
        kind,
        offset: e.offset,
        length: e.length,
    }
}

/// Convert a teloxide message into the core model. Captions stand in for
/// text on media messages, as they do for commands typed under a photo.
pub fn incoming_from_teloxide(msg: &Message) -> IncomingMessage {
    let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();
    let mut out = IncomingMessage::new(ChatId(msg.chat.id.0), MessageId(msg.id.0), text);

    out.sender = msg.from().map(sender_from);
    out.entities = msg
        .entities()
        .or_else(|| msg.caption_entities())
        .unwrap_or_default()
        .iter()
        .map(entity_from)
        .collect();
    out.contact = msg.contact().map(|c| Contact {
        phone: c.phone_number.clone(),
        user_id: c.user_id.map(tg_user_id),
    });
    out.is_private = msg.chat.is_private();
    out.is_sticker = msg.sticker().is_some();
    out.is_forward = msg.forward_date().is_some();
    out.via_bot = msg.via_bot.as_ref().map(|b| tg_user_id(b.id));
    out
}
