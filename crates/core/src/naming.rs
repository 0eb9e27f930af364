//! File name and folder validation, and storage key derivation.
//!
//! Storage keys have the form `<folder_id>/<name>`. When that key is taken,
//! candidates continue as `<folder_id>/<stem> (<n>)<.ext>`.

/// Identifier of the root folder.
pub const ROOT_FOLDER_ID: &str = "root";

/// Maximum length of a folder identifier.
pub const MAX_FOLDER_ID_LEN: usize = 128;

/// Validate a file name as a single storage path component.
pub fn validate_name(name: &str, max_len: usize) -> crate::Result<()> {
    validate_component(name, max_len).map_err(crate::Error::InvalidName)
}

/// Validate a folder identifier as a single storage path component.
pub fn validate_folder_id(folder_id: &str) -> crate::Result<()> {
    validate_component(folder_id, MAX_FOLDER_ID_LEN).map_err(crate::Error::InvalidFolder)
}

fn validate_component(s: &str, max_len: usize) -> Result<(), String> {
    if s.is_empty() {
        return Err("must not be empty".to_string());
    }
    if s.len() > max_len {
        return Err(format!("{} bytes exceeds maximum of {max_len}", s.len()));
    }
    if s == "." || s == ".." {
        return Err(format!("reserved name: {s}"));
    }
    if s.trim() != s {
        return Err(format!("leading or trailing whitespace: {s:?}"));
    }
    if let Some(c) = s.chars().find(|c| matches!(c, '/' | '\\' | '\0') || c.is_control()) {
        return Err(format!("invalid character {c:?} in {s:?}"));
    }
    Ok(())
}

/// Storage key for the `attempt`-th candidate of `name` inside `folder_id`.
///
/// Attempt 0 is the name itself. Later attempts insert a counter before the
/// extension, so `notes.txt` becomes `notes (1).txt`. Dot files and names
/// without an extension get the counter appended. The stem is shortened so
/// the last component never exceeds `max_len` bytes; when even the extension
/// leaves no room it is dropped as well.
pub fn candidate_path(folder_id: &str, name: &str, attempt: u32, max_len: usize) -> String {
    if attempt == 0 {
        return format!("{folder_id}/{name}");
    }
    let suffix = format!(" ({attempt})");
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    };

    if stem.len() + suffix.len() + ext.len() <= max_len {
        return format!("{folder_id}/{stem}{suffix}{ext}");
    }
    if suffix.len() + ext.len() < max_len {
        let stem = truncate_to(stem, max_len - suffix.len() - ext.len());
        return format!("{folder_id}/{stem}{suffix}{ext}");
    }
    let stem = truncate_to(name, max_len.saturating_sub(suffix.len()));
    format!("{folder_id}/{stem}{suffix}")
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_to(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
