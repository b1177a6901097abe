use std::path::Path;

/// The file extension every LOON document must carry.
pub const LOON_EXTENSION: &str = "loon";

const RESERVED_NAME_CHARS: &[char] = &['(', ')', '[', ']', ':', '.', '=', '@', '$', '%', '&', '<'];

/// Returns true if `path` ends in `.loon`.
pub fn has_loon_extension(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext == LOON_EXTENSION)
}

/// Label, space and reference-segment names: non-empty, no whitespace, no syntax characters.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name
            .chars()
            .any(|c| c.is_whitespace() || RESERVED_NAME_CHARS.contains(&c))
}
