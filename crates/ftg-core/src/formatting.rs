//! Formatting utilities for Telegram HTML parse mode.

/// Escape HTML special characters. Pass all untrusted input through this.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape HTML special characters and double quotes (for attribute values).
pub fn escape_quotes(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}
