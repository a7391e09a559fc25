/// Filename guard for every endpoint that touches a workflow file
///
/// Names arrive from URL paths, so they are percent-decoded repeatedly before
/// checking; nested encodings like `%252e%252e` must not slip through.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Decode passes applied before pattern checks
const DECODE_PASSES: usize = 3;

/// Substrings that never appear in a legitimate workflow filename
const FORBIDDEN_PATTERNS: &[&str] = &[
    "..", "\\", "/", "\0", "\n", "\r", "~", ":", "|", "<", ">", "*", "?", "$", ";", "&",
];

fn allowed_name() -> &'static Regex {
    static ALLOWED: OnceLock<Regex> = OnceLock::new();
    ALLOWED.get_or_init(|| Regex::new(r"^[A-Za-z0-9_\-]+\.json$").expect("static regex"))
}

/// Validate a workflow filename, returning the decoded name when it is safe
///
/// Rejects traversal segments, path separators, shell metacharacters and anything
/// that is not a plain `name.json`.
pub fn validate_filename(filename: &str) -> Option<String> {
    let mut decoded = filename.to_string();
    for _ in 0..DECODE_PASSES {
        decoded = urlencoding::decode(&decoded).ok()?.into_owned();
    }

    if FORBIDDEN_PATTERNS.iter().any(|p| decoded.contains(p)) {
        return None;
    }

    if !allowed_name().is_match(&decoded) {
        return None;
    }

    Some(decoded)
}

/// Check that `candidate` resolves inside `root` once symlinks are followed
///
/// Both paths must exist; a missing file is reported as outside.
pub fn resolves_within(root: &Path, candidate: &Path) -> bool {
    let (Ok(root), Ok(resolved)) = (root.canonicalize(), candidate.canonicalize()) else {
        return false;
    };
    resolved.starts_with(root)
}

/// Turn an arbitrary name into something `validate_filename` accepts
pub fn sanitize_filename(raw: &str) -> String {
    let stem = raw.strip_suffix(".json").unwrap_or(raw);
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    let cleaned = if cleaned.is_empty() { "workflow".to_string() } else { cleaned };
    format!("{}.json", cleaned)
}

/// Join a validated name onto a subdirectory of the workflows root
pub fn workflow_path(root: &Path, subdirectory: &str, filename: &str) -> PathBuf {
    root.join(subdirectory).join(filename)
}
