//! Helpers for modules to read the arguments of a command message.

/// Arguments after the command word, split shell-style.
///
/// Unbalanced quoting falls back to a single argument holding the whole raw
/// text, command word included.
pub fn get_args(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    match shlex::split(text) {
        Some(words) => words.into_iter().filter(|w| !w.is_empty()).skip(1).collect(),
        None => vec![text.to_string()],
    }
}

/// Everything after the command word, unsplit.
pub fn get_args_raw(text: &str) -> &str {
    let trimmed = text.trim_start();
    match trimmed.find(char::is_whitespace) {
        Some(idx) => trimmed[idx..].trim_start(),
        None => "",
    }
}

/// Raw arguments split on `sep`. Empty sections are dropped before trimming,
/// so a whitespace-only section survives as `""`.
pub fn get_args_split_by(text: &str, sep: &str) -> Vec<String> {
    get_args_raw(text)
        .split(sep)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().to_string())
        .collect()
}
