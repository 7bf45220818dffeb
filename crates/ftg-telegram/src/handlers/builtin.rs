//! The always-loaded `core` module: liveness, command listing, prefix changes.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use ftg_core::{
    args::get_args,
    formatting::escape_html,
    identity::SessionIdentity,
    message::IncomingMessage,
    messaging::{answer, port::MessagingPort},
    registry::{CommandHandler, Modules},
    store::{command_prefixes, ConfigStore, CORE_NAMESPACE, KEY_COMMAND_PREFIX},
    translations::Translator,
    Result,
};

pub const CORE_MODULE: &str = "core";

/// What the built-in handlers need to answer and persist settings.
#[derive(Clone)]
pub struct BuiltinDeps {
    pub messenger: Arc<dyn MessagingPort>,
    pub store: Arc<dyn ConfigStore>,
    pub identity: SessionIdentity,
    pub translator: Arc<Translator>,
}

impl BuiltinDeps {
    async fn answer(&self, message: &IncomingMessage, html: &str) -> Result<()> {
        answer(self.messenger.as_ref(), &self.identity, message, html).await
    }
}

/// Register `ping`, `setprefix` and `help` under [`CORE_MODULE`].
///
/// `help` snapshots the command table, so register it after every other module.
pub fn register_builtins(modules: &mut Modules, deps: BuiltinDeps) {
    modules
        .register_command(CORE_MODULE, "ping", Arc::new(Ping(deps.clone())))
        .register_command(CORE_MODULE, "setprefix", Arc::new(SetPrefix(deps.clone())));

    let mut listing = modules.commands();
    listing.push(("help".to_string(), CORE_MODULE.to_string()));
    listing.sort();
    modules.register_command(CORE_MODULE, "help", Arc::new(Help { deps, listing }));
}

struct Ping(BuiltinDeps);

#[async_trait]
impl CommandHandler for Ping {
    async fn handle(&self, message: &IncomingMessage) -> Result<()> {
        self.0.answer(message, "pong").await
    }
}

struct Help {
    deps: BuiltinDeps,
    listing: Vec<(String, String)>,
}

#[async_trait]
impl CommandHandler for Help {
    async fn handle(&self, message: &IncomingMessage) -> Result<()> {
        let prefixes = command_prefixes(self.deps.store.as_ref()).await?;
        let prefix = prefixes.first().map(String::as_str).unwrap_or_default();

        let mut out = self
            .deps
            .translator
            .gettext("<b>Available commands:</b>");
        for (name, module) in &self.listing {
            out.push_str(&format!(
                "\n<code>{}{}</code> ({})",
                escape_html(prefix),
                escape_html(name),
                escape_html(module)
            ));
        }
        self.deps.answer(message, &out).await
    }
}

struct SetPrefix(BuiltinDeps);

#[async_trait]
impl CommandHandler for SetPrefix {
    async fn handle(&self, message: &IncomingMessage) -> Result<()> {
        let t = &self.0.translator;
        let args = get_args(&message.text);
        let Some(first) = args.first() else {
            return self
                .0
                .answer(message, &t.gettext("<b>What should the prefix be set to?</b>"))
                .await;
        };

        let old = command_prefixes(self.0.store.as_ref()).await?;
        self.0
            .store
            .set(CORE_NAMESPACE, KEY_COMMAND_PREFIX, Value::from(args.clone()))
            .await?;

        let text = t
            .gettext("<b>Command prefix updated. Type</b> <code>{new}setprefix {old}</code> <b>to change it back</b>")
            .replace("{new}", &escape_html(first))
            .replace("{old}", &escape_html(&old.join(" ")));
        self.0.answer(message, &text).await
    }
}
