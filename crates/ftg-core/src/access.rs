//! Chat- and module-level allow/deny policy.
//!
//! `blacklist_chats` mixes two kinds of entries: integer chat ids and
//! `"<chat_id>.<module>"` strings. The latter is the module-level blacklist.

use std::collections::HashSet;

use serde_json::Value;

use crate::store::{
    ConfigStore, CORE_NAMESPACE, KEY_BLACKLIST_CHATS, KEY_WHITELIST_CHATS, KEY_WHITELIST_MODULES,
};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatPolicy {
    pub blacklist_chats: HashSet<i64>,
    pub blacklist_modules: HashSet<String>,
    pub whitelist_chats: HashSet<i64>,
    pub whitelist_modules: HashSet<String>,
}

impl ChatPolicy {
    /// Snapshot the persisted policy. Malformed entries are ignored.
    pub async fn load(store: &dyn ConfigStore) -> Self {
        let mut policy = Self::default();

        for v in list(store, KEY_BLACKLIST_CHATS).await {
            match v {
                Value::Number(n) => {
                    if let Some(id) = n.as_i64() {
                        policy.blacklist_chats.insert(id);
                    }
                }
                Value::String(s) => {
                    policy.blacklist_modules.insert(s);
                }
                _ => {}
            }
        }
        policy.whitelist_chats = list(store, KEY_WHITELIST_CHATS)
            .await
            .into_iter()
            .filter_map(|v| v.as_i64())
            .collect();
        policy.whitelist_modules = list(store, KEY_WHITELIST_MODULES)
            .await
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        policy
    }
}

async fn list(store: &dyn ConfigStore, key: &str) -> Vec<Value> {
    match store.get(CORE_NAMESPACE, key).await {
        Some(Value::Array(xs)) => xs,
        _ => Vec::new(),
    }
}

/// Key used for module-level policy entries.
pub fn module_key(chat_id: i64, module: &str) -> String {
    format!("{chat_id}.{module}")
}

/// Chat-level decision. A message without a sender is always denied.
pub fn chat_allowed(policy: &ChatPolicy, chat_id: i64, has_sender: bool) -> bool {
    if policy.blacklist_chats.contains(&chat_id) {
        return false;
    }
    if !policy.whitelist_chats.is_empty() && !policy.whitelist_chats.contains(&chat_id) {
        return false;
    }
    has_sender
}

/// Module-level decision for `module` in `chat_id`.
pub fn module_allowed(policy: &ChatPolicy, chat_id: i64, module: &str) -> bool {
    let key = module_key(chat_id, module);
    if policy.blacklist_modules.contains(&key) {
        return false;
    }
    policy.whitelist_modules.is_empty() || policy.whitelist_modules.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    async fn policy(blacklist: Value, whitelist: Value, modules: Value) -> ChatPolicy {
        let store = MemoryStore::new();
        store
            .set(CORE_NAMESPACE, KEY_BLACKLIST_CHATS, blacklist)
            .await
            .unwrap();
        store
            .set(CORE_NAMESPACE, KEY_WHITELIST_CHATS, whitelist)
            .await
            .unwrap();
        store
            .set(CORE_NAMESPACE, KEY_WHITELIST_MODULES, modules)
            .await
            .unwrap();
        ChatPolicy::load(&store).await
    }

    #[tokio::test]
    async fn load_splits_blacklist_entries() {
        let p = policy(json!([5, "7.mod_x", null]), json!([]), json!(["7.mod_y"])).await;
        assert!(p.blacklist_chats.contains(&5));
        assert!(p.blacklist_modules.contains("7.mod_x"));
        assert!(p.whitelist_chats.is_empty());
        assert!(p.whitelist_modules.contains("7.mod_y"));
    }

    #[tokio::test]
    async fn empty_store_allows_everything_with_sender() {
        let p = ChatPolicy::load(&MemoryStore::new()).await;
        assert!(chat_allowed(&p, 1, true));
        assert!(!chat_allowed(&p, 1, false));
        assert!(module_allowed(&p, 1, "anything"));
    }

    #[tokio::test]
    async fn blacklisted_chat_is_denied() {
        let p = policy(json!([5]), json!([]), json!([])).await;
        assert!(!chat_allowed(&p, 5, true));
        assert!(chat_allowed(&p, 6, true));
    }

    #[tokio::test]
    async fn non_empty_whitelist_is_exclusive() {
        let p = policy(json!([]), json!([5]), json!([])).await;
        assert!(chat_allowed(&p, 5, true));
        assert!(!chat_allowed(&p, 7, true));
    }

    #[tokio::test]
    async fn module_blacklist_is_scoped_to_chat_and_module() {
        let p = policy(json!(["7.mod_x"]), json!([]), json!([])).await;
        assert!(!module_allowed(&p, 7, "mod_x"));
        assert!(module_allowed(&p, 7, "mod_y"));
        assert!(module_allowed(&p, 8, "mod_x"));
        // a module key never blacklists the whole chat
        assert!(chat_allowed(&p, 7, true));
    }

    #[tokio::test]
    async fn module_whitelist_is_exclusive() {
        let p = policy(json!([]), json!([]), json!(["7.mod_x"])).await;
        assert!(module_allowed(&p, 7, "mod_x"));
        assert!(!module_allowed(&p, 7, "mod_y"));
        assert!(!module_allowed(&p, 8, "mod_x"));
    }
}
