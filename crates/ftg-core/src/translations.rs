//! Language packs and per-requester message lookup.
//!
//! A pack is a JSON document `{"language": "<locale>", "data": {key: text}}`.
//! Bot sessions read packs from a local directory; user sessions read the
//! latest post of a channel tagged with [`PACK_MAGIC`] and download its file.

use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::{message::EntityKind, ports::TranslationSource};

/// Hashtag that marks a channel post as a language pack.
pub const PACK_MAGIC: &str = "#ftgtrnsl1";

#[derive(Debug, Deserialize)]
struct Pack {
    language: String,
    data: HashMap<String, String>,
}

/// Where packs are loaded from, decided by the session kind.
pub enum PackLoader<'a> {
    Local(PathBuf),
    Channel(&'a dyn TranslationSource),
}

#[derive(Debug, Default)]
pub struct Translator {
    packs: Vec<String>,
    languages: Vec<String>,
    data: HashMap<String, HashMap<String, String>>,
}

impl Translator {
    pub fn new(packs: Vec<String>, languages: Vec<String>) -> Self {
        Self {
            packs,
            languages,
            data: HashMap::new(),
        }
    }

    /// Load every configured pack. Individual pack failures are logged and skipped.
    pub async fn init(&mut self, loader: PackLoader<'_>) {
        self.data.clear();
        let packs = self.packs.clone();
        for pack in &packs {
            let raw = match &loader {
                PackLoader::Local(dir) => read_local(dir, pack).await,
                PackLoader::Channel(source) => read_channel(*source, pack).await,
            };
            let Some(raw) = raw else {
                continue;
            };
            if let Err(e) = self.merge(&raw) {
                warn!(pack = %pack, error = %e, "language pack has wrong format");
            }
        }
    }

    /// Merge one raw pack document into the locale tables.
    pub fn merge(&mut self, raw: &[u8]) -> serde_json::Result<()> {
        let pack: Pack = serde_json::from_slice(raw)?;
        self.data.entry(pack.language).or_default().extend(pack.data);
        Ok(())
    }

    pub fn set_preferred_languages(&mut self, languages: Vec<String>) {
        self.languages = languages;
    }

    /// Text for `key` in the best locale for `requester_lang` (or the
    /// preferred languages when the requester declared none).
    pub fn getkey(&self, key: &str, requester_lang: Option<&str>) -> Option<&str> {
        let available: Vec<&str> = self
            .data
            .iter()
            .filter(|(_, strings)| strings.contains_key(key))
            .map(|(locale, _)| locale.as_str())
            .collect();

        let preferred: Vec<&str> = match requester_lang {
            Some(lang) if !lang.is_empty() => vec![lang],
            _ => self.languages.iter().map(String::as_str).collect(),
        };

        let locale = negotiate_locale(&preferred, &available)?;
        self.data.get(locale)?.get(key).map(String::as_str)
    }

    /// Translated `text`, or `text` itself when no locale defines it.
    pub fn gettext(&self, text: &str) -> String {
        self.getkey(text, None).unwrap_or(text).to_string()
    }
}

/// Bare language codes and the territory they stand for when a pack only
/// declares the full locale.
const LOCALE_ALIASES: &[(&str, &str)] = &[
    ("ar", "ar_SY"),
    ("bg", "bg_BG"),
    ("bs", "bs_BA"),
    ("ca", "ca_ES"),
    ("cs", "cs_CZ"),
    ("da", "da_DK"),
    ("de", "de_DE"),
    ("el", "el_GR"),
    ("en", "en_US"),
    ("es", "es_ES"),
    ("et", "et_EE"),
    ("fa", "fa_IR"),
    ("fi", "fi_FI"),
    ("fr", "fr_FR"),
    ("gl", "gl_ES"),
    ("he", "he_IL"),
    ("hu", "hu_HU"),
    ("id", "id_ID"),
    ("is", "is_IS"),
    ("it", "it_IT"),
    ("ja", "ja_JP"),
    ("km", "km_KH"),
    ("ko", "ko_KR"),
    ("lt", "lt_LT"),
    ("lv", "lv_LV"),
    ("mk", "mk_MK"),
    ("nl", "nl_NL"),
    ("nn", "nn_NO"),
    ("no", "nb_NO"),
    ("pl", "pl_PL"),
    ("pt", "pt_PT"),
    ("ro", "ro_RO"),
    ("ru", "ru_RU"),
    ("sk", "sk_SK"),
    ("sl", "sl_SI"),
    ("sv", "sv_SE"),
    ("th", "th_TH"),
    ("tr", "tr_TR"),
    ("uk", "uk_UA"),
];

fn locale_alias(locale: &str) -> Option<&'static str> {
    LOCALE_ALIASES
        .iter()
        .find(|(short, _)| short.eq_ignore_ascii_case(locale))
        .map(|(_, full)| *full)
}

/// First preferred locale (in order) that `available` can serve.
///
/// Per preferred locale: case-insensitive exact match, then its alias
/// (`en` → `en_US`), then the language part before `_` (`de_AT` → `de`).
pub fn negotiate_locale<'a>(preferred: &[&str], available: &[&'a str]) -> Option<&'a str> {
    let find = |want: &str| available.iter().copied().find(|a| a.eq_ignore_ascii_case(want));

    for &want in preferred {
        if let Some(hit) = find(want) {
            return Some(hit);
        }
        if let Some(hit) = locale_alias(want).and_then(find) {
            return Some(hit);
        }
        if let Some((lang, _)) = want.split_once('_') {
            if let Some(hit) = find(lang) {
                return Some(hit);
            }
        }
    }
    None
}

async fn read_local(dir: &std::path::Path, pack: &str) -> Option<Vec<u8>> {
    if pack.is_empty() || !pack.chars().all(|c| c.is_ascii_alphanumeric()) {
        warn!(pack = %pack, "language pack name invalid");
        return None;
    }
    let path = dir.join(format!("{pack}.json"));
    match tokio::fs::read(&path).await {
        Ok(raw) => Some(raw),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "language pack not found");
            None
        }
    }
}

async fn read_channel(source: &dyn TranslationSource, pack: &str) -> Option<Vec<u8>> {
    let post = match source.latest_message(pack).await {
        Ok(Some(post)) => post,
        Ok(None) => {
            warn!(pack = %pack, "no language pack post found");
            return None;
        }
        Err(e) => {
            warn!(pack = %pack, error = %e, "no language pack post found");
            return None;
        }
    };
    let Some(file) = post.file.as_deref() else {
        info!(pack = %pack, "latest post in language pack channel has no document");
        return None;
    };

    let tagged = post
        .message
        .entities
        .iter()
        .filter(|e| e.kind == EntityKind::Hashtag)
        .any(|e| post.message.entity_text(e).as_deref() == Some(PACK_MAGIC));
    if !tagged {
        info!(pack = %pack, "language pack hashtag not found");
        return None;
    }
    debug!(pack = %pack, "got language pack post");

    match source.download(file).await {
        Ok(raw) if std::str::from_utf8(&raw).is_ok() => Some(raw),
        Ok(_) => {
            warn!(pack = %pack, "language pack is not valid utf-8");
            None
        }
        Err(e) => {
            warn!(pack = %pack, error = %e, "unable to download language pack");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        domain::{ChatId, MessageId},
        message::{Entity, IncomingMessage},
        ports::PackMessage,
        Result,
    };

    fn pack(lang: &str, data: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({ "language": lang, "data": data })).unwrap()
    }

    fn tmp_dir(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        PathBuf::from(format!("/tmp/{prefix}-{}-{ts}", std::process::id()))
    }

    #[test]
    fn negotiation_prefers_order_then_language_part() {
        assert_eq!(negotiate_locale(&["fr", "en"], &["en", "fr"]), Some("fr"));
        assert_eq!(negotiate_locale(&["DE_at"], &["en", "de"]), Some("de"));
        assert_eq!(negotiate_locale(&["pt-BR"], &["pt"]), None);
        assert_eq!(negotiate_locale(&["ru"], &["en"]), None);
    }

    #[test]
    fn bare_language_resolves_through_alias() {
        assert_eq!(negotiate_locale(&["en"], &["en_US"]), Some("en_US"));
        assert_eq!(negotiate_locale(&["DE"], &["fr", "de_de"]), Some("de_de"));
        assert_eq!(negotiate_locale(&["no"], &["nb_NO"]), Some("nb_NO"));
        // exact match beats the alias
        assert_eq!(negotiate_locale(&["en"], &["en_US", "en"]), Some("en"));
        assert_eq!(negotiate_locale(&["en"], &["en_GB"]), None);
    }

    #[test]
    fn default_english_preference_serves_territory_pack() {
        let mut t = Translator::new(vec![], vec!["en".to_string()]);
        t.merge(&pack("en_US", json!({"hi": "Hi there"}))).unwrap();
        assert_eq!(t.gettext("hi"), "Hi there");
    }

    #[test]
    fn lookup_uses_requester_language_before_preferences() {
        let mut t = Translator::new(vec![], vec!["en".to_string()]);
        t.merge(&pack("en", json!({"hello": "Hello"}))).unwrap();
        t.merge(&pack("ru", json!({"hello": "Привет"}))).unwrap();

        assert_eq!(t.getkey("hello", None), Some("Hello"));
        assert_eq!(t.getkey("hello", Some("ru")), Some("Привет"));
        assert_eq!(t.getkey("missing", None), None);
    }

    #[test]
    fn gettext_falls_back_to_original() {
        let mut t = Translator::new(vec![], vec!["ru".to_string()]);
        t.merge(&pack("ru", json!({"Done": "Готово"}))).unwrap();
        assert_eq!(t.gettext("Done"), "Готово");
        assert_eq!(t.gettext("Untranslated"), "Untranslated");

        t.set_preferred_languages(vec!["en".to_string()]);
        assert_eq!(t.gettext("Done"), "Done");
    }

    #[test]
    fn merge_rejects_wrong_shape() {
        let mut t = Translator::default();
        assert!(t.merge(br#"{"lang": "en"}"#).is_err());
    }

    #[tokio::test]
    async fn local_packs_skip_invalid_names_and_missing_files() {
        let dir = tmp_dir("ftg-packs");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ru.json"), pack("ru", json!({"a": "б"}))).unwrap();
        std::fs::write(dir.join("bad.json"), b"{not json").unwrap();

        let mut t = Translator::new(
            vec![
                "ru".to_string(),
                "../etc".to_string(),
                "bad".to_string(),
                "nope".to_string(),
            ],
            vec!["ru".to_string()],
        );
        t.init(PackLoader::Local(dir.clone())).await;
        assert_eq!(t.gettext("a"), "б");

        let _ = std::fs::remove_dir_all(&dir);
    }

    struct FakeChannel {
        post: Option<PackMessage>,
        downloads: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TranslationSource for FakeChannel {
        async fn latest_message(&self, _channel: &str) -> Result<Option<PackMessage>> {
            Ok(self.post.clone())
        }

        async fn download(&self, file: &str) -> Result<Vec<u8>> {
            self.downloads.lock().unwrap().push(file.to_string());
            Ok(pack("de", json!({"a": "ä"})))
        }
    }

    fn post(text: &str, tag_offset: usize, tag_len: usize, file: Option<&str>) -> PackMessage {
        let mut message = IncomingMessage::new(ChatId(-1001), MessageId(9), text);
        message.entities.push(Entity {
            kind: EntityKind::Hashtag,
            offset: tag_offset,
            length: tag_len,
        });
        PackMessage {
            message,
            file: file.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn channel_pack_requires_magic_hashtag_and_file() {
        let tagged = FakeChannel {
            post: Some(post("German #ftgtrnsl1", 7, 10, Some("doc1"))),
            downloads: Mutex::new(vec![]),
        };
        let mut t = Translator::new(vec!["chan".to_string()], vec!["de".to_string()]);
        t.init(PackLoader::Channel(&tagged)).await;
        assert_eq!(t.gettext("a"), "ä");
        assert_eq!(*tagged.downloads.lock().unwrap(), vec!["doc1"]);

        let untagged = FakeChannel {
            post: Some(post("German #other", 7, 6, Some("doc1"))),
            downloads: Mutex::new(vec![]),
        };
        let mut t = Translator::new(vec!["chan".to_string()], vec!["de".to_string()]);
        t.init(PackLoader::Channel(&untagged)).await;
        assert_eq!(t.gettext("a"), "a");
        assert!(untagged.downloads.lock().unwrap().is_empty());

        let no_file = FakeChannel {
            post: Some(post("German #ftgtrnsl1", 7, 10, None)),
            downloads: Mutex::new(vec![]),
        };
        let mut t = Translator::new(vec!["chan".to_string()], vec!["de".to_string()]);
        t.init(PackLoader::Channel(&no_file)).await;
        assert!(no_file.downloads.lock().unwrap().is_empty());
    }
}
