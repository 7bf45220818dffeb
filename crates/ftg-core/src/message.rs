//! Messenger-agnostic model of one inbound chat event.
//!
//! Telegram-specific conversion lives in the adapter crate; the router only
//! ever sees this type.

use crate::domain::{ChatId, MessageId, MessageRef, UserId};

/// Offset that Telegram adds to bare channel / supergroup ids.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Addressing structure of the chat a message was sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Peer {
    User(i64),
    Chat(i64),
    Channel(i64),
}

impl Peer {
    /// Classify a wire chat id (`> 0` user, `-100…` channel, other negative ids basic groups).
    pub fn from_chat_id(chat_id: ChatId) -> Self {
        let id = chat_id.0;
        if id > 0 {
            Peer::User(id)
        } else if id <= -CHANNEL_ID_OFFSET {
            Peer::Channel(-(id + CHANNEL_ID_OFFSET))
        } else {
            Peer::Chat(-id)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    pub id: UserId,
    pub username: Option<String>,
    pub lang_code: Option<String>,
    pub phone: Option<String>,
}

/// A shared contact card attached to the message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub phone: String,
    pub user_id: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Hashtag,
    Mention,
    TextMention { user_id: UserId },
    Other,
}

/// Text annotation. Offsets and lengths are UTF-16 code units.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

#[derive(Clone, Debug)]
pub struct IncomingMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub peer: Peer,
    pub sender: Option<Sender>,
    /// Raw text (or caption). Rewritten in place during command normalization.
    pub text: String,
    pub entities: Vec<Entity>,
    pub contact: Option<Contact>,
    pub is_private: bool,
    pub is_sticker: bool,
    pub is_forward: bool,
    pub is_outgoing: bool,
    pub via_bot: Option<UserId>,
}

impl IncomingMessage {
    /// Minimal text message; everything optional is empty.
    pub fn new(chat_id: ChatId, message_id: MessageId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            message_id,
            peer: Peer::from_chat_id(chat_id),
            sender: None,
            text: text.into(),
            entities: Vec::new(),
            contact: None,
            is_private: chat_id.0 > 0,
            is_sticker: false,
            is_forward: false,
            is_outgoing: false,
            via_bot: None,
        }
    }

    pub fn message_ref(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat_id,
            message_id: self.message_id,
        }
    }

    pub fn sender_id(&self) -> Option<UserId> {
        self.sender.as_ref().map(|s| s.id)
    }

    /// Chat id used for allow/deny policy: the chat id for private chats, the
    /// bare peer id (without the `-100` channel prefix) otherwise.
    pub fn policy_chat_id(&self) -> i64 {
        match self.peer {
            Peer::User(_) => self.chat_id.0,
            Peer::Chat(id) | Peer::Channel(id) => id,
        }
    }

    /// Copy of this message with sensitive fields replaced by a
    /// length-preserving placeholder. Only for logs and audit records.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        if let Some(sender) = out.sender.as_mut() {
            if let Some(phone) = sender.phone.as_mut() {
                *phone = redact(phone);
            }
        }
        if let Some(contact) = out.contact.as_mut() {
            contact.phone = redact(&contact.phone);
        }
        out
    }

    /// Text covered by `entity`, or `None` if the range falls outside the text.
    pub fn entity_text(&self, entity: &Entity) -> Option<String> {
        let units: Vec<u16> = self.text.encode_utf16().collect();
        let end = entity.offset.checked_add(entity.length)?;
        let slice = units.get(entity.offset..end)?;
        String::from_utf16(slice).ok()
    }
}

fn redact(value: &str) -> String {
    format!("redacted_{}_chars", value.chars().count())
}
