//! Extensions of files a thumbnail can be generated for
//!
//! Used when the user gives no include patterns.

/// Still images
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff", "ico", "heic", "heif", "avif",
    "svg", "raw", "cr2", "nef", "arw", "dng",
];

/// Video containers
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mkv", "mov", "avi", "wmv", "webm", "flv", "mpg", "mpeg", "3gp", "ts", "mts",
    "m2ts", "ogv",
];

/// Audio files, which may carry embedded cover art
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "m4a", "aac", "wav", "opus", "wma"];

/// Documents
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf"];

/// Archives
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "cbz", "cbr", "rar", "7z", "tar", "gz"];

/// Every default extension, grouped by kind
pub fn default_media_extensions() -> impl Iterator<Item = &'static str> {
    [
        IMAGE_EXTENSIONS,
        VIDEO_EXTENSIONS,
        AUDIO_EXTENSIONS,
        DOCUMENT_EXTENSIONS,
        ARCHIVE_EXTENSIONS,
    ]
    .into_iter()
    .flatten()
    .copied()
}

/// Convert extensions to recursive glob patterns
///
/// Matching is case-insensitive, so one pattern per extension is enough.
pub fn extensions_to_patterns<'a>(extensions: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    extensions
        .into_iter()
        .map(|ext| format!("**/*.{ext}"))
        .collect()
}
