//! Normalised absolute path strings.
//!
//! Every path handled by the cache is `/`-prefixed, has no empty, `.` or
//! trailing segments, and is case-sensitive. The root is `/`.

use crate::error::{GdfsError, Result};

pub const SEPARATOR: char = '/';
pub const ROOT: &str = "/";

/// Normalise a caller-supplied path. Empty input is the root.
pub fn normalize(path: &str) -> Result<String> {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(GdfsError::InvalidArgument(format!(
                    "parent segments are not supported: {path}"
                )))
            }
            s => {
                out.push(SEPARATOR);
                out.push_str(s);
            }
        }
    }
    if out.is_empty() {
        out.push(SEPARATOR);
    }
    Ok(out)
}

pub fn is_root(path: &str) -> bool {
    path == ROOT
}

/// Segments of a normalised path; empty for the root.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Split a normalised path into its parent path and leaf name.
pub fn parent_and_name(path: &str) -> Option<(String, String)> {
    if is_root(path) {
        return None;
    }
    let (parent, name) = path.rsplit_once(SEPARATOR)?;
    let parent = if parent.is_empty() { ROOT.to_string() } else { parent.to_string() };
    Some((parent, name.to_string()))
}

/// Join a normalised parent path and a leaf name.
pub fn join(parent: &str, name: &str) -> String {
    if is_root(parent) {
        format!("{SEPARATOR}{name}")
    } else {
        format!("{parent}{SEPARATOR}{name}")
    }
}

/// True when `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    if is_root(ancestor) {
        return !is_root(path);
    }
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == SEPARATOR as u8
}
