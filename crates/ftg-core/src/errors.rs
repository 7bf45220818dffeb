/// Core error type.
///
/// Adapter crates map their transport errors into `External`; modules map
/// their own failures into `Module` so the router can log and re-raise them
/// without caring where they came from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("identity resolution failed: {0}")]
    Identity(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),

    #[error("module {module} failed: {reason}")]
    Module { module: String, reason: String },
}

impl Error {
    pub fn module(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
