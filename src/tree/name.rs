//! Node name normalization

use crate::error::FsError;
use unicode_normalization::UnicodeNormalization;

/// Validate a node name and return its NFC form.
///
/// Sibling uniqueness is checked on the normalized form, so names that only
/// differ in Unicode composition collide.
pub fn normalize_name(raw: &str) -> Result<String, FsError> {
    if raw.trim().is_empty() {
        return Err(FsError::InvalidName("name cannot be empty".to_string()));
    }
    if raw.contains('/') || raw.contains('\0') {
        return Err(FsError::InvalidName(format!(
            "\"{}\" contains a path separator or NUL",
            raw
        )));
    }
    if raw == "." || raw == ".." {
        return Err(FsError::InvalidName(format!("\"{}\" is reserved", raw)));
    }
    Ok(raw.nfc().collect())
}

/// Lowercased extension after the last dot, or empty.
pub fn extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "js", "jsx", "ts", "tsx", "css", "html", "json", "c", "cpp", "h", "py", "java",
    "sh",
];

/// Whether a file with this name opens in the text editor.
pub fn is_text_file(name: &str) -> bool {
    TEXT_EXTENSIONS.contains(&extension(name).as_str())
}
