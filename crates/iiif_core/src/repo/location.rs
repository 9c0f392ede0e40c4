//! Validation of store locations passed to `set_db_path_or_url`.
//!
//! # Invariants
//! - Validation never touches the store itself; it only rejects strings that
//!   cannot possibly name one.

use std::path::{Path, PathBuf};
use url::Url;

/// Validates a relational database file path.
///
/// Rejects blank strings, NUL bytes, URL-shaped strings and paths whose
/// parent directory does not exist.
pub fn parse_db_path(location: &str) -> Option<PathBuf> {
    let trimmed = location.trim();
    if trimmed.is_empty() || trimmed.contains('\0') || trimmed.contains("://") {
        return None;
    }

    let path = Path::new(trimmed);
    if path.file_name().is_none() {
        return None;
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => None,
        _ => Some(path.to_path_buf()),
    }
}

/// Validates a SPARQL endpoint url (`http` or `https` with a host).
pub fn parse_sparql_endpoint(location: &str) -> Option<Url> {
    let url = Url::parse(location.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;
    Some(url)
}
