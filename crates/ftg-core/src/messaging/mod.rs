//! Outbound messaging abstractions.

pub mod port;

use crate::{identity::SessionIdentity, message::IncomingMessage, Result};

use port::MessagingPort;

/// Give the response to a command: edit in place when the session sent the
/// message itself, reply to it otherwise.
pub async fn answer(
    messenger: &dyn MessagingPort,
    identity: &SessionIdentity,
    message: &IncomingMessage,
    html: &str,
) -> Result<()> {
    if identity.is_self(message.sender_id()) {
        messenger.edit_html(message.message_ref(), html).await
    } else {
        messenger.reply_html(message.message_ref(), html).await?;
        Ok(())
    }
}
