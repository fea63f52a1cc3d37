//! Filename and path tokenization.

use std::path::Path;

/// Lowercased file stem (extension stripped).
pub fn normalized_stem(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| file_name.to_lowercase())
}

/// Split a name into lowercase tokens on whitespace, `_`, `-` and `.`,
/// dropping empty and purely punctuation tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| c.is_whitespace() || matches!(c, '_' | '-' | '.'))
        .filter(|t| t.chars().any(char::is_alphanumeric))
        .map(str::to_string)
        .collect()
}

/// Tokens of a file name, extension stripped.
pub fn filename_tokens(file_name: &str) -> Vec<String> {
    tokenize(&normalized_stem(file_name))
}

/// Directory names between `root` and `file`, outermost first.
/// Returns an empty list when `file` is not under `root`.
pub fn segments_between(root: &Path, file: &Path) -> Vec<String> {
    let Some(parent) = file.parent() else {
        return Vec::new();
    };
    match parent.strip_prefix(root) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Parent directory names of `file`, outermost first, used when no explicit
/// segments were supplied.
pub fn parent_segments(file: &Path) -> Vec<String> {
    file.parent()
        .map(|p| {
            p.components()
                .filter_map(|c| match c {
                    std::path::Component::Normal(s) => Some(s.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Words of a model label usable for hint matching (3+ characters).
pub fn label_words(label: &str) -> Vec<String> {
    label
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_string)
        .collect()
}
