//! Static extension to input-category table.

use serde::{Deserialize, Serialize};

/// Broad kind of an input file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputCategory {
    Audio,
    Video,
    Image,
    Document,
    Misc,
}

const CATEGORIES: &[(InputCategory, &[&str])] = &[
    (
        InputCategory::Audio,
        &[
            "aac", "aiff", "ape", "cda", "flac", "m4a", "mp3", "oga", "ogg", "opus", "wav", "wma",
        ],
    ),
    (
        InputCategory::Video,
        &[
            "3gp", "avi", "flv", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogv", "vob", "webm",
            "wmv",
        ],
    ),
    (
        InputCategory::Image,
        &[
            "avif", "bmp", "exr", "gif", "heic", "ico", "jpeg", "jpg", "png", "psd", "svg", "tga",
            "tif", "tiff", "webp",
        ],
    ),
    (
        InputCategory::Document,
        &[
            "doc", "docx", "odp", "ods", "odt", "pdf", "ppt", "pptx", "xls", "xlsx",
        ],
    ),
];

/// Normalize an extension: strip a leading dot and lower-case it.
pub fn normalize_extension(extension: &str) -> String {
    extension
        .strip_prefix('.')
        .unwrap_or(extension)
        .to_ascii_lowercase()
}

/// Extension of `path`, normalized. Empty when the path has none.
pub fn extension_of(path: &std::path::Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(normalize_extension)
        .unwrap_or_default()
}

/// Category of an extension (dot and case insensitive).
pub fn category_of(extension: &str) -> InputCategory {
    let extension = normalize_extension(extension);
    CATEGORIES
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(category, _)| *category)
        .unwrap_or(InputCategory::Misc)
}
