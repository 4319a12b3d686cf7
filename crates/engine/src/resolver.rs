//! Confinement of untrusted request paths to the shared root.
//!
//! Every filesystem path the server opens is produced here. Resolution is a
//! pure path computation: the request path is split on `/`, joined onto the
//! root one segment at a time, normalized, and accepted only if the result is
//! the root itself or lies beneath it by whole path components. Nothing in
//! this module touches the filesystem, so existence checks happen later and
//! separately.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

use crate::error::{EngineError, Result};

/// The directory being shared. Absolute, lexically normalized, and fixed for
/// the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedRoot {
    path: PathBuf,
}

impl ConfinedRoot {
    /// Build a root from a user-supplied path.
    ///
    /// A relative `path` is made absolute against `base` (normally the current
    /// working directory). `.` and `..` are folded lexically; symlinks are not
    /// resolved.
    pub fn new(path: impl AsRef<Path>, base: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.as_ref().join(path)
        };
        Self {
            path: normalize_lexically(&absolute),
        }
    }

    /// The root as a filesystem path.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Whether `candidate` is the root or nested under it.
    ///
    /// The comparison is per component, so `/srv/data-secret` is not inside
    /// `/srv/data`.
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.starts_with(&self.path)
    }
}

/// A request path that has passed confinement.
///
/// Holds both the absolute filesystem location and the normalized
/// request-relative form (`/` or `/a/b`) used for links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    request_path: String,
}

impl ResolvedPath {
    /// Absolute filesystem path, guaranteed to be inside the root.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Normalized request-relative path, always starting with `/`.
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// True when this is the shared root itself.
    pub fn is_root(&self) -> bool {
        self.request_path == "/"
    }

    /// Last path component, used as the download filename.
    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

/// Maps request paths onto the confined root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: ConfinedRoot,
}

impl PathResolver {
    /// Create a resolver for the given root.
    pub fn new(root: ConfinedRoot) -> Self {
        Self { root }
    }

    /// Resolve a percent-decoded, slash-separated request path.
    ///
    /// Leading slashes are request-relative, not filesystem-absolute: `/etc`
    /// resolves to `<root>/etc`. `..` segments are folded against the joined
    /// path and only the final result is checked, so `a/../b` is accepted while
    /// `../x` from the root is not. Segments that the platform would parse as
    /// more than one plain component (a drive prefix, an embedded separator)
    /// and segments containing NUL are rejected outright.
    pub fn resolve(&self, request_path: &str) -> Result<ResolvedPath> {
        let root = self.root.as_path();
        let mut joined = root.to_path_buf();

        for segment in request_path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    joined.pop();
                }
                _ if is_plain_segment(segment) => joined.push(segment),
                _ => {
                    warn!(request_path, segment, "rejected non-plain path segment");
                    return Err(EngineError::Confinement(request_path.to_string()));
                }
            }
        }

        let resolved = normalize_lexically(&joined);
        if !self.root.contains(&resolved) {
            warn!(request_path, resolved = %resolved.display(), "rejected path outside root");
            return Err(EngineError::Confinement(request_path.to_string()));
        }

        let relative = resolved
            .strip_prefix(root)
            .map_err(|_| EngineError::Confinement(request_path.to_string()))?;
        let request_path = relative_to_request_path(relative);

        Ok(ResolvedPath {
            path: resolved,
            request_path,
        })
    }
}

/// Normalize a request path for display and navigation.
///
/// Produces `/` or `/a/b`: no empty or `.` segments, no trailing slash. `..`
/// is clamped at the top, so this never fails. It is not a confinement check;
/// use [`PathResolver::resolve`] before touching the filesystem.
pub fn normalize_request_path(request_path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in request_path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Fold `.` and `..` without consulting the filesystem. `..` at the top of an
/// absolute path stays at the top.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn is_plain_segment(segment: &str) -> bool {
    if segment.contains('\0') {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn relative_to_request_path(relative: &Path) -> String {
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", segments.join("/"))
}
