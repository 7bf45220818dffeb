//! Ports for the chat client's account and history access.
//!
//! Messaging mutations live in [`crate::messaging::port`]; module lookup and
//! authorization in [`crate::registry`] and [`crate::security`].

use async_trait::async_trait;

use crate::{domain::UserId, message::IncomingMessage, Result};

/// The account the session is authenticated as.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: UserId,
    pub username: Option<String>,
    pub is_bot: bool,
}

#[async_trait]
pub trait AccountPort: Send + Sync {
    async fn get_me(&self) -> Result<Account>;
}

/// A channel post that may carry a language pack attachment.
#[derive(Clone, Debug)]
pub struct PackMessage {
    pub message: IncomingMessage,
    /// Opaque handle of the attached document, if any.
    pub file: Option<String>,
}

/// Channel history access, used to locate language packs for user sessions.
#[async_trait]
pub trait TranslationSource: Send + Sync {
    /// Most recent message of `channel`, `None` if it is empty or unreachable.
    async fn latest_message(&self, channel: &str) -> Result<Option<PackMessage>>;
    async fn download(&self, file: &str) -> Result<Vec<u8>>;
}
