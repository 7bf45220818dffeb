use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::{errors::Error, Result};

const DEFAULT_DB_PATH: &str = "./ftg-db.json";
const DEFAULT_TRANSLATIONS_DIR: &str = "./translations";

/// Process-level configuration. Everything the router reads at runtime lives
/// in the [`crate::store::ConfigStore`] instead.
#[derive(Clone, Debug)]
pub struct Config {
    pub bot_token: String,
    /// Users the default security gate lets run commands besides the session itself.
    pub owners: Vec<i64>,
    pub db_path: PathBuf,
    pub translations_dir: PathBuf,

    // Audit
    pub audit_log_path: Option<PathBuf>,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_env()
    }

    /// Build from the current environment only (no `.env` lookup).
    pub fn from_env() -> Result<Self> {
        let bot_token = env_str("FTG_BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "FTG_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let owners = parse_csv_i64(env_str("FTG_OWNERS"));
        let db_path = env_path("FTG_DB_PATH").unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let translations_dir = env_path("FTG_TRANSLATIONS_DIR")
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRANSLATIONS_DIR));

        let audit_log_path = env_str("FTG_AUDIT_LOG_PATH")
            .and_then(non_empty)
            .map(PathBuf::from);
        let audit_log_json = env_bool("FTG_AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            bot_token,
            owners,
            db_path,
            translations_dir,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }
        out.push((key.to_string(), val));
    }
    out
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotenv_lines_are_parsed_with_quotes_and_comments() {
        let parsed = parse_dotenv(
            "# comment\nFTG_BOT_TOKEN=\"abc:def\"\n\nFTG_OWNERS = 1, 2\nbroken line\n=novalue\nX='y'\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("FTG_BOT_TOKEN".to_string(), "abc:def".to_string()),
                ("FTG_OWNERS".to_string(), "1, 2".to_string()),
                ("X".to_string(), "y".to_string()),
            ]
        );
    }

    #[test]
    fn csv_ids_skip_garbage() {
        assert_eq!(
            parse_csv_i64(Some(" 1, x,,-5 ".to_string())),
            vec![1, -5]
        );
        assert!(parse_csv_i64(None).is_empty());
    }

    #[test]
    fn bool_flags_accept_common_spellings() {
        for yes in ["1", "true", "YES", " on "] {
            assert!(parse_bool(yes));
        }
        for no in ["0", "false", "", "nope"] {
            assert!(!parse_bool(no));
        }
    }
}
