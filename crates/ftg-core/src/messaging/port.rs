use async_trait::async_trait;

use crate::{
    domain::{ChatId, MessageRef},
    Result,
};

/// Mutation primitives of the chat client.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    /// Send a new message to the chat ("respond").
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef>;
    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef>;
    async fn edit_html(&self, msg: MessageRef, html: &str) -> Result<()>;
}
