use std::sync::Arc;

use ftg_core::{
    config::Config,
    logging::LogLevel,
    store::{ConfigStore, JsonFileStore, CORE_NAMESPACE, KEY_LOGLEVEL},
};

#[tokio::main]
async fn main() -> Result<(), ftg_core::Error> {
    let cfg = Arc::new(Config::load()?);

    // The log level is persisted alongside the rest of the settings.
    let store = Arc::new(JsonFileStore::open(&cfg.db_path).await?);
    let level = LogLevel::from_value(store.get(CORE_NAMESPACE, KEY_LOGLEVEL).await.as_ref());
    ftg_core::logging::init("ftg", level)?;
    tracing::info!(db = %store.path().display(), "settings loaded");

    let store: Arc<dyn ConfigStore> = store;
    ftg_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| ftg_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
