use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tracing::info;

use ftg_core::{
    audit::AuditLogger,
    config::Config,
    dispatcher::{CommandRouter, RouterDeps},
    identity::SessionIdentity,
    messaging::port::MessagingPort,
    registry::Modules,
    security::OwnerGate,
    store::{string_list, ConfigStore, KEY_LANGPACKS, KEY_LANGUAGE},
    translations::{PackLoader, Translator},
};

use crate::handlers::{self, BuiltinDeps};
use crate::TelegramMessenger;

pub struct AppState {
    pub router: CommandRouter,
}

/// Languages used when the store has no `language` entry.
const DEFAULT_LANGUAGES: &[&str] = &["en"];

pub async fn run_polling(cfg: Arc<Config>, store: Arc<dyn ConfigStore>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.bot_token.clone());
    let telegram = Arc::new(TelegramMessenger::new(bot.clone()));

    // Nothing may be routed before the session knows who it is.
    let identity = SessionIdentity::resolve(telegram.as_ref()).await?;
    info!(
        handle = %identity.self_handle(),
        id = identity.self_id().0,
        "ftg started"
    );
    info!(owners = cfg.owners.len(), "security gate configured");

    let translator = Arc::new(load_translator(&cfg, store.as_ref()).await);
    let messenger: Arc<dyn MessagingPort> = telegram;

    let mut modules = Modules::new();
    handlers::register_builtins(
        &mut modules,
        BuiltinDeps {
            messenger: messenger.clone(),
            store: store.clone(),
            identity: identity.clone(),
            translator: translator.clone(),
        },
    );

    let deps = RouterDeps {
        modules: Arc::new(modules),
        store,
        security: Arc::new(OwnerGate::new(identity.clone(), cfg.owners.clone())),
        messenger,
        translator,
    };
    let mut router = CommandRouter::new(identity, deps);
    if let Some(path) = &cfg.audit_log_path {
        info!(path = %path.display(), "audit log enabled");
        router = router.with_audit(Arc::new(AuditLogger::new(
            path.clone(),
            cfg.audit_log_json,
        )));
    }

    let state = Arc::new(AppState { router });

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}

/// Bot sessions cannot read channel history, so packs come from the local directory.
async fn load_translator(cfg: &Config, store: &dyn ConfigStore) -> Translator {
    let packs = string_list(store, KEY_LANGPACKS, &[]).await;
    let languages = string_list(store, KEY_LANGUAGE, DEFAULT_LANGUAGES).await;
    let mut translator = Translator::new(packs, languages);
    translator
        .init(PackLoader::Local(cfg.translations_dir.clone()))
        .await;
    translator
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftg_core::store::{MemoryStore, CORE_NAMESPACE};
    use serde_json::json;

    #[tokio::test]
    async fn translator_reads_configured_packs_from_local_dir() {
        let dir = std::path::PathBuf::from(format!(
            "/tmp/ftg-router-packs-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("ru.json"),
            serde_json::to_vec(&json!({"language": "ru", "data": {"pong": "понг"}})).unwrap(),
        )
        .unwrap();

        let cfg = Config {
            bot_token: "t".to_string(),
            owners: vec![],
            db_path: dir.join("db.json"),
            translations_dir: dir.clone(),
            audit_log_path: None,
            audit_log_json: false,
        };
        let store = MemoryStore::new();
        store
            .set(CORE_NAMESPACE, KEY_LANGPACKS, json!(["ru"]))
            .await
            .unwrap();

        let t = load_translator(&cfg, &store).await;
        assert_eq!(t.gettext("pong"), "pong");

        store
            .set(CORE_NAMESPACE, KEY_LANGUAGE, json!(["ru"]))
            .await
            .unwrap();
        let t = load_translator(&cfg, &store).await;
        assert_eq!(t.gettext("pong"), "понг");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
