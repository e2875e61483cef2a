//! Extension → language table for the supported file set.
//!
//! Only files whose extension appears here are indexed; everything else is
//! skipped silently. Keep the table stable: language counts feed tool
//! selection downstream.

/// Extensions the indexer accepts (lowercase, no dot).
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "rs", "py", "js", "jsx", "ts", "tsx", "java", "kt", "kts", "go", "rb", "php", "c", "h", "cc",
    "cpp", "hpp", "cs", "swift", "scala", "sh", "bash", "yaml", "yml", "json", "toml", "xml",
    "sql", "md", "html", "css",
];

/// Maps a lowercase extension to its language tag.
/// Unknown extensions map to `"other"` (callers filter by
/// [`SUPPORTED_EXTENSIONS`] first, so this is a fallback, not a gate).
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext {
        "rs" => "rust",
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        "c" | "h" => "c",
        "cc" | "cpp" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "scala" => "scala",
        "sh" | "bash" => "shell",
        "yaml" | "yml" => "yaml",
        "json" => "json",
        "toml" => "toml",
        "xml" => "xml",
        "sql" => "sql",
        "md" => "markdown",
        "html" => "html",
        "css" => "css",
        _ => "other",
    }
}

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
}
