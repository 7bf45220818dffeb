//! Append-only audit trail of routed commands.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};

use crate::{message::IncomingMessage, Result};

const AUDIT_MAX_TEXT: usize = 500;

#[derive(Clone, Debug, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,
    pub chat_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    pub content: String,
    pub outcome: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEvent {
    /// Record for one prefixed message. `message` must already be redacted.
    pub fn command(message: &IncomingMessage, outcome: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event: "command".to_string(),
            chat_id: message.chat_id.0,
            user_id: message.sender_id().map(|u| u.0),
            username: message.sender.as_ref().and_then(|s| s.username.clone()),
            content: message.text.clone(),
            outcome: outcome.to_string(),
            module: None,
            error: None,
        }
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_string());
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line per event: JSON, or `plain_line` for humans.
    pub async fn write(&self, mut event: AuditEvent) -> Result<()> {
        event.content = truncate_text(&event.content, AUDIT_MAX_TEXT);
        event.error = event.error.map(|e| truncate_text(&e, AUDIT_MAX_TEXT));

        let mut line = if self.json {
            serde_json::to_string(&event)?
        } else {
            plain_line(&event)
        };
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// `<timestamp> <event> chat=<id> [user=..] outcome=.. [module=..] [error=".."] content=".."`
fn plain_line(event: &AuditEvent) -> String {
    let mut line = format!("{} {} chat={}", event.timestamp, event.event, event.chat_id);
    if let Some(user) = event.user_id {
        line.push_str(&format!(" user={user}"));
    }
    if let Some(name) = &event.username {
        line.push_str(&format!(" username={name}"));
    }
    line.push_str(&format!(" outcome={}", event.outcome));
    if let Some(module) = &event.module {
        line.push_str(&format!(" module={module}"));
    }
    if let Some(error) = &event.error {
        line.push_str(&format!(" error={error:?}"));
    }
    line.push_str(&format!(" content={:?}", event.content));
    line
}

pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId};

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn truncate_text_adds_ellipsis() {
        let s = "a".repeat(AUDIT_MAX_TEXT + 10);
        let t = truncate_text(&s, AUDIT_MAX_TEXT);
        assert!(t.ends_with("..."));
        assert_eq!(t.chars().count(), AUDIT_MAX_TEXT + 3);
        assert_eq!(truncate_text("short", AUDIT_MAX_TEXT), "short");
    }

    #[tokio::test]
    async fn json_lines_are_truncated_on_write() {
        let log = AuditLogger::new(tmp_file("ftg-audit-test"), true);
        let msg = IncomingMessage::new(ChatId(3), MessageId(1), "x".repeat(AUDIT_MAX_TEXT + 1));
        log.write(AuditEvent::command(&msg, "invoked").with_module("core"))
            .await
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(v["outcome"], "invoked");
        assert_eq!(v["module"], "core");
        assert_eq!(v["chat_id"], 3);
        assert!(v["content"].as_str().unwrap().ends_with("..."));
        assert!(v.get("error").is_none());
        let _ = std::fs::remove_file(log.path());
    }

    #[tokio::test]
    async fn plain_format_is_one_line_per_event() {
        let log = AuditLogger::new(tmp_file("ftg-audit-plain"), false);
        let msg = IncomingMessage::new(ChatId(3), MessageId(1), ".ping\nsecond line");
        log.write(AuditEvent::command(&msg, "failed").with_error("boom"))
            .await
            .unwrap();
        log.write(AuditEvent::command(&msg, "invoked").with_module("core"))
            .await
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" command chat=3 outcome=failed error=\"boom\""));
        assert!(lines[0].ends_with(r#"content=".ping\nsecond line""#));
        assert!(lines[1].contains("outcome=invoked module=core"));
        let _ = std::fs::remove_file(log.path());
    }
}
