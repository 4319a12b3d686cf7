//! Parent-directory links.

use crate::resolver::normalize_request_path;

/// Request path of the directory above `request_path`.
///
/// Returns `None` at the root, so repeatedly following the result always
/// terminates. A first-level path yields `/`.
pub fn parent_of(request_path: &str) -> Option<String> {
    let normalized = normalize_request_path(request_path);
    if normalized == "/" {
        return None;
    }

    match normalized.rsplit_once('/') {
        Some(("", _)) | None => Some("/".to_string()),
        Some((parent, _)) => Some(parent.to_string()),
    }
}
