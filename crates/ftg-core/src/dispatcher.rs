//! Routes inbound chat events to command handlers and watchers.
//!
//! The command path is a fixed sequence of guards. Each guard either lets the
//! event through or stops it with an [`Ignored`] reason; stops are silent
//! (debug log only). Only two things cross this layer as errors: a failing
//! handler (after one best-effort notice to the user) and failures of the
//! chat client / store while routing.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::{
    access::{chat_allowed, module_allowed, ChatPolicy},
    audit::{AuditEvent, AuditLogger},
    errors::Error,
    formatting::escape_html,
    identity::SessionIdentity,
    message::IncomingMessage,
    messaging::port::MessagingPort,
    registry::{CommandBinding, ModuleRegistry},
    security::SecurityGate,
    store::{command_prefixes, ConfigStore},
    translations::Translator,
    Result,
};

const GENERIC_FAILURE: &str = "<b>Sorry, something went wrong!</b>";
const DETAILED_FAILURE: &str = "<b>Request failed! Request was</b> <code>{request}</code><b>. \
Please report it in the support group (</b><code>{prefix}support</code><b>) \
along with the logs (</b><code>{prefix}logs error</code><b>)</b>";

/// Tag that addresses the session regardless of its handle.
const SELF_TAG: &str = "me";

/// Why an event did not reach a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ignored {
    NoText,
    NoPrefix,
    InlineBot,
    ChatDenied,
    PrefixOnly,
    /// `cmd@name` where `name` is not this session.
    OtherTarget,
    /// Untagged command from someone else in a group.
    NotAddressed,
    UnknownCommand,
    Unauthorized,
    ModuleDenied,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    Invoked { command: String, module: String },
    Ignored(Ignored),
}

/// What the watcher fan-out does when a watcher's module is denied in a chat.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WatcherDenial {
    /// Stop delivering this event to the remaining watchers.
    #[default]
    AbortFanOut,
    /// Skip only the denied watcher.
    SkipWatcher,
}

enum Halt {
    Ignored(Ignored),
    Failed(Error),
}

impl From<Ignored> for Halt {
    fn from(reason: Ignored) -> Self {
        Halt::Ignored(reason)
    }
}

impl From<Error> for Halt {
    fn from(e: Error) -> Self {
        Halt::Failed(e)
    }
}

fn ensure(cond: bool, reason: Ignored) -> std::result::Result<(), Halt> {
    if cond {
        Ok(())
    } else {
        Err(Halt::Ignored(reason))
    }
}

/// A command that passed every guard.
struct Dispatch {
    binding: CommandBinding,
    message: IncomingMessage,
}

/// Collaborators shared by every event.
#[derive(Clone)]
pub struct RouterDeps {
    pub modules: Arc<dyn ModuleRegistry>,
    pub store: Arc<dyn ConfigStore>,
    pub security: Arc<dyn SecurityGate>,
    pub messenger: Arc<dyn MessagingPort>,
    pub translator: Arc<Translator>,
}

pub struct CommandRouter {
    deps: RouterDeps,
    identity: SessionIdentity,
    watcher_denial: WatcherDenial,
    audit: Option<Arc<AuditLogger>>,
}

impl CommandRouter {
    pub fn new(identity: SessionIdentity, deps: RouterDeps) -> Self {
        Self {
            deps,
            identity,
            watcher_denial: WatcherDenial::default(),
            audit: None,
        }
    }

    pub fn with_watcher_denial(mut self, policy: WatcherDenial) -> Self {
        self.watcher_denial = policy;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Command path: at most one handler invocation per event.
    ///
    /// A handler error is returned unchanged after one attempt to tell the user.
    pub async fn handle_command(&self, event: &IncomingMessage) -> Result<Routed> {
        let prefixes = command_prefixes(self.deps.store.as_ref()).await?;

        let prefix = match select_prefix(event, &prefixes) {
            Ok(prefix) => prefix,
            Err(reason) => return Ok(Routed::Ignored(reason)),
        };
        let redacted = event.redacted();
        debug!(message = ?redacted, "incoming command");
        if event.is_sticker {
            debug!("command sent with a sticker");
        }
        if event.via_bot.is_some() {
            debug!("ignoring inline bot");
            return Ok(self.ignored(&redacted, Ignored::InlineBot).await);
        }

        let Dispatch { binding, message } = match self.route(event, prefix).await {
            Ok(dispatch) => dispatch,
            Err(Halt::Ignored(reason)) => return Ok(self.ignored(&redacted, reason).await),
            Err(Halt::Failed(e)) => return Err(e),
        };

        match binding.handler.handle(&message).await {
            Ok(()) => {
                self.record(AuditEvent::command(&redacted, "invoked").with_module(&binding.module))
                    .await;
                Ok(Routed::Invoked {
                    command: binding.name,
                    module: binding.module,
                })
            }
            Err(e) => {
                error!(
                    command = %binding.name,
                    module = %binding.module,
                    error = %e,
                    "command failed"
                );
                if let Err(notice) = self.notify_failure(&message, prefix).await {
                    warn!(error = %notice, "failed to report command failure");
                }
                self.record(
                    AuditEvent::command(&redacted, "failed")
                        .with_module(&binding.module)
                        .with_error(&e.to_string()),
                )
                .await;
                Err(e)
            }
        }
    }

    /// Guards after prefix selection, in order. Side effects: the self-escape
    /// edit and the in-memory rewrite of the message text.
    async fn route(
        &self,
        event: &IncomingMessage,
        prefix: &str,
    ) -> std::result::Result<Dispatch, Halt> {
        let policy = ChatPolicy::load(self.deps.store.as_ref()).await;
        let chat_id = event.policy_chat_id();
        ensure(
            chat_allowed(&policy, chat_id, event.sender.is_some()),
            Ignored::ChatDenied,
        )?;

        if !self.identity.is_bot() && is_escaped(&event.text, prefix) {
            let literal = escape_html(&event.text[prefix.len()..]);
            self.deps
                .messenger
                .edit_html(event.message_ref(), &literal)
                .await?;
        }

        let mut message = event.clone();
        let rest = &event.text[prefix.len()..];
        ensure(!rest.is_empty(), Ignored::PrefixOnly)?;
        message.text = rest.to_string();

        let (token, remainder) = split_command(rest).ok_or(Ignored::PrefixOnly)?;
        let (name, tag) = match token.split_once('@') {
            Some((name, tag)) => (name, Some(tag.to_lowercase())),
            None => (token, None),
        };

        let handle = self.identity.self_handle();
        let tagged_self = matches!(tag.as_deref(), Some(t) if t == handle || t == SELF_TAG);
        ensure(tag.is_none() || tagged_self, Ignored::OtherTarget)?;
        let from_self = self.identity.is_self(event.sender_id());
        ensure(
            from_self || event.is_private || tagged_self,
            Ignored::NotAddressed,
        )?;
        debug!(command = %name, "resolving command");

        let (canonical, binding) = self.deps.modules.dispatch(name);
        let binding = binding.ok_or(Ignored::UnknownCommand)?;

        ensure(
            self.deps.security.check(&message, &binding).await,
            Ignored::Unauthorized,
        )?;

        message.text = format!("{canonical}{remainder}");

        ensure(
            module_allowed(&policy, chat_id, &binding.module),
            Ignored::ModuleDenied,
        )?;

        Ok(Dispatch { binding, message })
    }

    async fn notify_failure(&self, message: &IncomingMessage, prefix: &str) -> Result<()> {
        let t = &self.deps.translator;
        if self.identity.is_bot() {
            self.deps
                .messenger
                .send_html(message.chat_id, &t.gettext(GENERIC_FAILURE))
                .await?;
        } else {
            let text = t
                .gettext(DETAILED_FAILURE)
                .replace("{request}", &escape_html(&message.text))
                .replace("{prefix}", prefix);
            self.deps
                .messenger
                .edit_html(message.message_ref(), &text)
                .await?;
        }
        Ok(())
    }

    /// Passive path: deliver `event` to every watcher in order.
    ///
    /// Watcher failures are logged and swallowed; nothing propagates.
    pub async fn handle_incoming(&self, event: &IncomingMessage) {
        debug!("incoming message");
        let redacted = event.redacted();

        let policy = ChatPolicy::load(self.deps.store.as_ref()).await;
        let chat_id = event.policy_chat_id();
        if !chat_allowed(&policy, chat_id, event.sender.is_some()) {
            debug!(message = ?redacted, "message is blacklisted");
            return;
        }

        for binding in self.deps.modules.watchers() {
            if !module_allowed(&policy, chat_id, &binding.module) {
                debug!(module = %binding.module, chat_id, "watcher is blocked in chat");
                match self.watcher_denial {
                    WatcherDenial::AbortFanOut => return,
                    WatcherDenial::SkipWatcher => continue,
                }
            }
            if let Err(e) = binding.watcher.watch(event).await {
                error!(module = %binding.module, error = %e, "error running watcher");
            }
        }
    }

    async fn ignored(&self, message: &IncomingMessage, reason: Ignored) -> Routed {
        debug!(?reason, "command ignored");
        if !matches!(reason, Ignored::NoText | Ignored::NoPrefix) {
            self.record(AuditEvent::command(message, &format!("{reason:?}")))
                .await;
        }
        Routed::Ignored(reason)
    }

    async fn record(&self, event: AuditEvent) {
        let Some(audit) = &self.audit else {
            return;
        };
        if let Err(e) = audit.write(event).await {
            warn!(error = %e, "audit write failed");
        }
    }
}

/// First configured prefix (list order, not longest match) the text starts with.
fn select_prefix<'a>(
    event: &IncomingMessage,
    prefixes: &'a [String],
) -> std::result::Result<&'a str, Ignored> {
    if event.text.is_empty() {
        return Err(Ignored::NoText);
    }
    prefixes
        .iter()
        .find(|p| event.text.starts_with(p.as_str()))
        .map(String::as_str)
        .ok_or(Ignored::NoPrefix)
}

/// `text` starts with `prefix` twice but is not just `prefix` repeated.
fn is_escaped(text: &str, prefix: &str) -> bool {
    let prefix_len = prefix.chars().count();
    let text_len = text.chars().count();
    if prefix_len == 0 || text_len <= prefix_len {
        return false;
    }
    text.starts_with(&prefix.repeat(2)) && text != prefix.repeat(text_len / prefix_len)
}

/// First whitespace-delimited word of `rest` and everything after it.
fn split_command(rest: &str) -> Option<(&str, &str)> {
    let start = rest.find(|c: char| !c.is_whitespace())?;
    let tail = &rest[start..];
    let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
    Some((&tail[..end], &tail[end..]))
}
