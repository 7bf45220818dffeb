//! Command handlers, watchers and the registry the router looks them up in.
//!
//! Every handler is registered together with the name of the module that owns
//! it; that name is what module-level policy keys are built from.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{message::IncomingMessage, Result};

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, message: &IncomingMessage) -> Result<()>;
}

/// Passive observer invoked for every inbound message.
#[async_trait]
pub trait Watcher: Send + Sync {
    async fn watch(&self, message: &IncomingMessage) -> Result<()>;
}

#[derive(Clone)]
pub struct CommandBinding {
    pub name: String,
    pub module: String,
    pub handler: Arc<dyn CommandHandler>,
}

impl std::fmt::Debug for CommandBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBinding")
            .field("name", &self.name)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct WatcherBinding {
    pub module: String,
    pub watcher: Arc<dyn Watcher>,
}

/// Lookup surface the router depends on.
pub trait ModuleRegistry: Send + Sync {
    /// Resolve a typed command token to `(canonical_text, binding)`.
    fn dispatch(&self, token: &str) -> (String, Option<CommandBinding>);

    /// Watchers in registration order.
    fn watchers(&self) -> Vec<WatcherBinding>;
}

#[derive(Default)]
pub struct Modules {
    commands: HashMap<String, CommandBinding>,
    aliases: HashMap<String, String>,
    watchers: Vec<WatcherBinding>,
}

impl Modules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` (case-insensitive) for `module`. A later registration replaces an earlier one.
    pub fn register_command(
        &mut self,
        module: &str,
        name: &str,
        handler: Arc<dyn CommandHandler>,
    ) -> &mut Self {
        let name = name.to_lowercase();
        self.commands.insert(
            name.clone(),
            CommandBinding {
                name,
                module: module.to_string(),
                handler,
            },
        );
        self
    }

    pub fn register_alias(&mut self, alias: &str, command: &str) -> &mut Self {
        self.aliases
            .insert(alias.to_lowercase(), command.to_lowercase());
        self
    }

    pub fn register_watcher(&mut self, module: &str, watcher: Arc<dyn Watcher>) -> &mut Self {
        self.watchers.push(WatcherBinding {
            module: module.to_string(),
            watcher,
        });
        self
    }

    /// `(command, module)` pairs sorted by command name.
    pub fn commands(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = self
            .commands
            .values()
            .map(|b| (b.name.clone(), b.module.clone()))
            .collect();
        out.sort();
        out
    }
}

impl ModuleRegistry for Modules {
    fn dispatch(&self, token: &str) -> (String, Option<CommandBinding>) {
        let key = token.to_lowercase();
        if let Some(binding) = self.commands.get(&key) {
            return (token.to_string(), Some(binding.clone()));
        }
        if let Some(target) = self.aliases.get(&key) {
            if let Some(binding) = self.commands.get(target) {
                return (target.clone(), Some(binding.clone()));
            }
        }
        (token.to_string(), None)
    }

    fn watchers(&self) -> Vec<WatcherBinding> {
        self.watchers.clone()
    }
}
