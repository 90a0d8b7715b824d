//! Root-relative key paths for json-cow trees.
//!
//! A [`Path`] is an ordered sequence of string keys addressing a location in
//! a JSON-shaped tree. The empty path addresses the root; array indices are
//! carried in decimal string form. Equality is structural.
//!
//! Paths render as JSON Pointer-style strings (`/a/b/0`) for diagnostics,
//! with the usual `~0`/`~1` escapes so keys containing `~` or `/` survive a
//! round trip.
//!
//! # Example
//!
//! ```
//! use json_cow_path::{format_path, parse_path};
//!
//! let path = parse_path("/users/0/name");
//! assert_eq!(path, vec!["users".to_string(), "0".to_string(), "name".to_string()]);
//! assert_eq!(format_path(&path), "/users/0/name");
//! ```

use thiserror::Error;

/// A single step in a path: an object key or a decimal array index.
pub type PathStep = String;

/// A root-relative sequence of keys. Empty for the root itself.
pub type Path = Vec<PathStep>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("NO_PARENT")]
    NoParent,
}

/// Unescape a rendered path component (`~1` to `/`, `~0` to `~`).
pub fn unescape_step(step: &str) -> String {
    if !step.contains('~') {
        return step.to_string();
    }
    // Order matters: ~1 must be replaced before ~0
    step.replace("~1", "/").replace("~0", "~")
}

/// Escape a path component for rendering (`/` to `~1`, `~` to `~0`).
pub fn escape_step(step: &str) -> String {
    if !step.contains('/') && !step.contains('~') {
        return step.to_string();
    }
    // Order matters: ~ must be escaped before /
    step.replace('~', "~0").replace('/', "~1")
}

/// Parse a pointer-style string into a path.
///
/// The empty string is the root path; a leading `/` is stripped and each
/// component is unescaped.
///
/// # Example
///
/// ```
/// use json_cow_path::parse_path;
///
/// assert_eq!(parse_path(""), Vec::<String>::new());
/// assert_eq!(parse_path("/a/0"), vec!["a", "0"]);
/// assert_eq!(parse_path("/a~0b/c~1d"), vec!["a~b", "c/d"]);
/// ```
pub fn parse_path(pointer: &str) -> Path {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer[1..].split('/').map(unescape_step).collect()
}

/// Render a path as a pointer-style string. The root path renders empty.
///
/// # Example
///
/// ```
/// use json_cow_path::format_path;
///
/// assert_eq!(format_path(&[]), "");
/// assert_eq!(format_path(&["a".to_string(), "0".to_string()]), "/a/0");
/// ```
pub fn format_path(path: &[PathStep]) -> String {
    if path.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for step in path {
        out.push('/');
        out.push_str(&escape_step(step));
    }
    out
}

/// Extend a path by one step, returning the child path.
pub fn join(path: &[PathStep], step: &str) -> Path {
    let mut child = Vec::with_capacity(path.len() + 1);
    child.extend_from_slice(path);
    child.push(step.to_string());
    child
}

/// True if the step is a canonical non-negative array index
/// (decimal digits, no leading zero except `"0"` itself).
pub fn is_valid_index(step: &str) -> bool {
    if step.is_empty() {
        return false;
    }
    let bytes = step.as_bytes();
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|b| b.is_ascii_digit())
}

/// True if the step consists only of ASCII digits.
pub fn is_integer(step: &str) -> bool {
    !step.is_empty() && step.bytes().all(|b| b.is_ascii_digit())
}

/// True if `parent` strictly contains `child`.
pub fn is_child(parent: &[PathStep], child: &[PathStep]) -> bool {
    parent.len() < child.len() && parent == &child[..parent.len()]
}

/// Structural path equality.
pub fn is_path_equal(a: &[PathStep], b: &[PathStep]) -> bool {
    a == b
}

/// The parent of a path, or `PathError::NoParent` for the root.
///
/// # Example
///
/// ```
/// use json_cow_path::parent;
///
/// assert_eq!(parent(&["a".to_string(), "b".to_string()]).unwrap(), vec!["a"]);
/// assert!(parent(&[]).is_err());
/// ```
pub fn parent(path: &[PathStep]) -> Result<Path, PathError> {
    if path.is_empty() {
        return Err(PathError::NoParent);
    }
    Ok(path[..path.len() - 1].to_vec())
}
