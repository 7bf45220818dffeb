//! Telegram update handlers.
//!
//! Every message goes through two independent paths:
//! - the watcher fan-out, for messages the session did not send itself
//! - the command router, for everything that is not a forward

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};
use tracing::{debug, warn};

use crate::{incoming_from_teloxide, router::AppState};

pub mod builtin;

pub use builtin::{register_builtins, BuiltinDeps, CORE_MODULE};

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let mut event = incoming_from_teloxide(&msg);
    event.is_outgoing = state.router.identity().is_self(event.sender_id());

    if !event.is_outgoing {
        state.router.handle_incoming(&event).await;
    }

    if event.is_forward {
        debug!("skipping forwarded message for commands");
        return Ok(());
    }

    if let Err(e) = state.router.handle_command(&event).await {
        // Already logged and reported by the router.
        warn!(chat_id = event.chat_id.0, error = %e, "command ended with an error");
    }

    Ok(())
}
