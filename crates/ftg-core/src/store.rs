//! Persistent key-value configuration store.
//!
//! Values are namespaced JSON documents. The router reads its policy keys
//! from [`CORE_NAMESPACE`] on every event, so a store must be cheap to read.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::{errors::Error, Result};

/// Namespace shared by the router and the startup sequence.
pub const CORE_NAMESPACE: &str = "friendly-telegram.main";

pub const KEY_COMMAND_PREFIX: &str = "command_prefix";
pub const KEY_BLACKLIST_CHATS: &str = "blacklist_chats";
pub const KEY_WHITELIST_CHATS: &str = "whitelist_chats";
pub const KEY_WHITELIST_MODULES: &str = "whitelist_modules";
pub const KEY_LOGLEVEL: &str = "loglevel";
pub const KEY_LANGPACKS: &str = "langpacks";
pub const KEY_LANGUAGE: &str = "language";

pub const DEFAULT_PREFIX: &str = ".";

#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Option<Value>;
    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()>;

    async fn get_or(&self, namespace: &str, key: &str, default: Value) -> Value {
        self.get(namespace, key).await.unwrap_or(default)
    }
}

type Document = BTreeMap<String, BTreeMap<String, Value>>;

fn lookup(data: &Document, namespace: &str, key: &str) -> Option<Value> {
    data.get(namespace).and_then(|ns| ns.get(key)).cloned()
}

fn insert(data: &mut Document, namespace: &str, key: &str, value: Value) {
    data.entry(namespace.to_string())
        .or_default()
        .insert(key.to_string(), value);
}

/// In-process store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A panic elsewhere must not make the policy keys read as empty.
    fn lock(&self) -> MutexGuard<'_, Document> {
        self.data.lock().unwrap_or_else(|poisoned| {
            warn!("memory store lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[async_trait]
impl ConfigStore for MemoryStore {
    async fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        lookup(&self.lock(), namespace, key)
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        insert(&mut self.lock(), namespace, key, value);
        Ok(())
    }
}

/// Store backed by a single JSON file, rewritten on every `set`.
///
/// The document lock is held across the write so files land in `set` order.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    data: tokio::sync::Mutex<Document>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(txt) if txt.trim().is_empty() => Document::new(),
            Ok(txt) => serde_json::from_str(&txt)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::new(),
            Err(e) => return Err(Error::Io(e)),
        };
        Ok(Self {
            path,
            data: tokio::sync::Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, data: &Document) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(data)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonFileStore {
    async fn get(&self, namespace: &str, key: &str) -> Option<Value> {
        lookup(&*self.data.lock().await, namespace, key)
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        let mut data = self.data.lock().await;
        insert(&mut data, namespace, key, value);
        self.persist(&data).await
    }
}

/// Python-style truthiness, used where the persisted format relied on it.
pub(crate) fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(xs) => !xs.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Read the configured prefixes, never empty.
///
/// A legacy scalar string is migrated to a one-element list and written back.
pub async fn command_prefixes(store: &dyn ConfigStore) -> Result<Vec<String>> {
    let raw = store
        .get_or(CORE_NAMESPACE, KEY_COMMAND_PREFIX, Value::Bool(false))
        .await;
    if !is_truthy(&raw) {
        return Ok(vec![DEFAULT_PREFIX.to_string()]);
    }

    let prefixes = match raw {
        Value::String(s) => {
            let migrated = vec![s];
            store
                .set(
                    CORE_NAMESPACE,
                    KEY_COMMAND_PREFIX,
                    Value::from(migrated.clone()),
                )
                .await?;
            migrated
        }
        Value::Array(xs) => xs
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if prefixes.is_empty() {
        return Ok(vec![DEFAULT_PREFIX.to_string()]);
    }
    Ok(prefixes)
}

/// Read a list of strings (e.g. `langpacks`, `language`), falling back to `default`.
pub async fn string_list(store: &dyn ConfigStore, key: &str, default: &[&str]) -> Vec<String> {
    match store.get(CORE_NAMESPACE, key).await {
        Some(Value::Array(xs)) => xs
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s],
        _ => default.iter().map(|s| s.to_string()).collect(),
    }
}
