//! Shared normalization helpers for adapter output.

use crate::types::Severity;

/// Maps a tool's severity label onto the canonical ladder.
/// Any unmapped value becomes `Low`, deterministically.
pub fn severity_from_label(label: &str) -> Severity {
    match label.to_ascii_lowercase().as_str() {
        "critical" | "blocker" => Severity::Critical,
        "high" | "error" | "err" => Severity::High,
        "medium" | "moderate" | "warning" | "warn" => Severity::Medium,
        "low" | "minor" => Severity::Low,
        "info" | "note" | "information" | "hint" => Severity::Info,
        _ => Severity::Low,
    }
}

/// Splits a `path:line[:column]` location string. Returns `None` when the
/// line is not numeric (plain paths stay intact rather than mis-splitting
/// on a drive letter or URL).
pub fn split_location(loc: &str) -> Option<(String, u32, Option<u32>)> {
    let mut parts = loc.rsplitn(3, ':');
    let last = parts.next()?;
    let middle = parts.next()?;
    let head = parts.next();

    match head {
        Some(path) => {
            // path:line:column
            let line: u32 = middle.parse().ok()?;
            let column: u32 = last.parse().ok()?;
            Some((path.to_string(), line, Some(column)))
        }
        None => {
            // path:line
            let line: u32 = last.parse().ok()?;
            Some((middle.to_string(), line, None))
        }
    }
}

/// Strips `root` from an absolute tool-reported path, yielding the
/// repo-relative form with forward slashes.
pub fn relativize(path: &str, root: &std::path::Path) -> String {
    let p = std::path::Path::new(path);
    let rel = p.strip_prefix(root).unwrap_or(p);
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_labels() {
        assert_eq!(severity_from_label("ERROR"), Severity::High);
        assert_eq!(severity_from_label("moderate"), Severity::Medium);
        assert_eq!(severity_from_label("critical"), Severity::Critical);
        assert_eq!(severity_from_label("note"), Severity::Info);
    }

    #[test]
    fn unmapped_labels_become_low() {
        assert_eq!(severity_from_label("bizarre"), Severity::Low);
        assert_eq!(severity_from_label(""), Severity::Low);
    }

    #[test]
    fn splits_line_and_column_locations() {
        assert_eq!(
            split_location("src/a.rs:10:5"),
            Some(("src/a.rs".into(), 10, Some(5)))
        );
        assert_eq!(split_location("src/a.rs:10"), Some(("src/a.rs".into(), 10, None)));
        assert_eq!(split_location("src/a.rs"), None);
        assert_eq!(split_location("src/a.rs:x:y"), None);
    }

    #[test]
    fn relativizes_under_root() {
        let root = std::path::Path::new("/tmp/work");
        assert_eq!(relativize("/tmp/work/src/a.rs", root), "src/a.rs");
        assert_eq!(relativize("src/a.rs", root), "src/a.rs");
    }
}
