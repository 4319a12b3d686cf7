//! Directory listing.
//!
//! Lists the immediate children of a confined directory and turns each one
//! into an [`EntryDescriptor`] ready for rendering. Children whose metadata
//! cannot be read are dropped from the listing rather than failing it.
//!
//! # Ordering
//!
//! Entries are returned directories first, then files. Within each group
//! names compare case-insensitively, with the exact name as tie-breaker, so
//! the order does not depend on the platform's enumeration order.
//!
//! # Limits
//!
//! The whole directory is read into memory before the result is returned.
//! Very large directories are therefore bounded only by available memory.

use std::fs;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::navigation::parent_of;
use crate::resolver::ResolvedPath;
use crate::size::format_size;

/// Display format for modification times.
pub const MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Reads metadata for a directory child.
///
/// The default implementation asks the filesystem; tests substitute readers
/// that fail for selected entries.
pub trait MetadataReader: Send + Sync {
    /// Metadata for `entry`, without following a final symlink.
    fn read(&self, entry: &fs::DirEntry) -> io::Result<fs::Metadata>;
}

/// Metadata straight from the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsMetadata;

impl MetadataReader for FsMetadata {
    fn read(&self, entry: &fs::DirEntry) -> io::Result<fs::Metadata> {
        entry.metadata()
    }
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryDescriptor {
    /// Entry name (not full path).
    pub name: String,
    /// Size in bytes. `None` for directories.
    pub size: Option<u64>,
    /// Last modified time.
    pub modified: DateTime<Utc>,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// Request-relative path of the entry, e.g. `/docs/a.txt`.
    pub path: String,
    /// Human-readable size. `None` for directories.
    pub size_display: Option<String>,
}

impl EntryDescriptor {
    /// Modification time in local time, `YYYY-MM-DD HH:MM`.
    pub fn modified_display(&self) -> String {
        self.modified
            .with_timezone(&Local)
            .format(MODIFIED_FORMAT)
            .to_string()
    }
}

/// Result of listing one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingResult {
    /// Request-relative path of the listed directory.
    pub path: String,
    /// Children in display order.
    pub entries: Vec<EntryDescriptor>,
    /// Request path of the parent directory, `None` at the root.
    pub parent: Option<String>,
}

/// Listing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    /// Include entries whose name starts with `.`.
    pub include_hidden: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_hidden: true,
        }
    }
}

/// Directory lister.
///
/// Stateless between calls; one instance can serve any number of concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct DirectoryLister<M = FsMetadata> {
    reader: M,
    options: ListOptions,
}

impl DirectoryLister<FsMetadata> {
    /// Create a lister that reads metadata from the filesystem.
    pub fn new(options: ListOptions) -> Self {
        Self::with_reader(FsMetadata, options)
    }
}

impl<M: MetadataReader> DirectoryLister<M> {
    /// Create a lister with a custom metadata reader.
    pub fn with_reader(reader: M, options: ListOptions) -> Self {
        Self { reader, options }
    }

    /// List the immediate children of `dir`.
    ///
    /// Fails with [`EngineError::NotFound`] if `dir` does not exist and
    /// [`EngineError::NotDirectory`] if it is not a directory. Children that
    /// cannot be read are skipped.
    pub fn list(&self, dir: &ResolvedPath) -> Result<ListingResult> {
        let path = dir.as_path();

        let metadata = fs::metadata(path).map_err(|e| EngineError::from_io(e, path))?;
        if !metadata.is_dir() {
            return Err(EngineError::NotDirectory(path.to_path_buf()));
        }

        let read_dir = fs::read_dir(path).map_err(|e| EngineError::from_io(e, path))?;

        let mut entries = Vec::new();
        for entry_result in read_dir {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    debug!(dir = %path.display(), error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            // A lossy name would link to a file that does not exist.
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!(dir = %path.display(), name = ?raw, "skipping entry with non-UTF-8 name");
                    continue;
                }
            };

            if !self.options.include_hidden && name.starts_with('.') {
                continue;
            }

            let metadata = match self.reader.read(&entry) {
                Ok(m) => m,
                Err(err) => {
                    debug!(dir = %path.display(), name, error = %err, "skipping entry without metadata");
                    continue;
                }
            };

            let is_dir = metadata.is_dir();
            let size = (!is_dir).then(|| metadata.len());
            let modified = metadata
                .modified()
                .ok()
                .and_then(to_utc)
                .unwrap_or_default();

            entries.push(EntryDescriptor {
                path: child_request_path(dir.request_path(), &name),
                name,
                size,
                modified,
                is_dir,
                size_display: size.map(format_size),
            });
        }

        entries.sort_by_cached_key(|e| (!e.is_dir, e.name.to_lowercase(), e.name.clone()));

        debug!(dir = %path.display(), count = entries.len(), "listed directory");

        Ok(ListingResult {
            path: dir.request_path().to_string(),
            entries,
            parent: parent_of(dir.request_path()),
        })
    }
}

/// Join a child name onto a normalized request path without doubling the
/// separator at the root.
pub fn child_request_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent, name)
    }
}

fn to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    let since_epoch = time.duration_since(UNIX_EPOCH).ok()?;
    let secs = i64::try_from(since_epoch.as_secs()).ok()?;
    DateTime::from_timestamp(secs, since_epoch.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ConfinedRoot, PathResolver};
    use std::path::Path;
    use tempfile::TempDir;

    fn create_test_structure(dir: &Path) {
        fs::create_dir_all(dir.join("sub")).unwrap();
        fs::create_dir_all(dir.join("sub/deeper")).unwrap();
        fs::write(dir.join("a.txt"), vec![b'x'; 2048]).unwrap();
        fs::write(dir.join("sub/nested.txt"), "Nested").unwrap();
        fs::write(dir.join(".hidden"), "Hidden").unwrap();
    }

    fn resolver_for(dir: &Path) -> PathResolver {
        PathResolver::new(ConfinedRoot::new(dir, "/"))
    }

    /// Fails for every entry whose name starts with `broken`.
    struct FailingReader;

    impl MetadataReader for FailingReader {
        fn read(&self, entry: &fs::DirEntry) -> io::Result<fs::Metadata> {
            if entry.file_name().to_string_lossy().starts_with("broken") {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "simulated"))
            } else {
                entry.metadata()
            }
        }
    }

    #[test]
    fn test_list_root() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let resolver = resolver_for(temp_dir.path());
        let lister = DirectoryLister::new(ListOptions::default());
        let listing = lister.list(&resolver.resolve("/").unwrap()).unwrap();

        assert_eq!(listing.path, "/");
        assert_eq!(listing.parent, None);

        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["sub", ".hidden", "a.txt"]);

        let sub = &listing.entries[0];
        assert!(sub.is_dir);
        assert_eq!(sub.path, "/sub");
        assert_eq!(sub.size, None);
        assert_eq!(sub.size_display, None);

        let file = &listing.entries[2];
        assert!(!file.is_dir);
        assert_eq!(file.path, "/a.txt");
        assert_eq!(file.size, Some(2048));
        assert_eq!(file.size_display.as_deref(), Some("2.00 KB"));
    }

    #[test]
    fn test_list_excludes_hidden() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let resolver = resolver_for(temp_dir.path());
        let lister = DirectoryLister::new(ListOptions {
            include_hidden: false,
        });
        let listing = lister.list(&resolver.resolve("/").unwrap()).unwrap();

        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["sub", "a.txt"]);
    }

    #[test]
    fn test_list_nested_paths_and_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_test_structure(temp_dir.path());

        let resolver = resolver_for(temp_dir.path());
        let lister = DirectoryLister::new(ListOptions::default());
        let listing = lister.list(&resolver.resolve("/sub/").unwrap()).unwrap();

        assert_eq!(listing.path, "/sub");
        assert_eq!(listing.parent.as_deref(), Some("/"));

        let paths: Vec<&str> = listing.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/sub/deeper", "/sub/nested.txt"]);

        let deeper = lister.list(&resolver.resolve("/sub/deeper").unwrap()).unwrap();
        assert!(deeper.entries.is_empty());
        assert_eq!(deeper.parent.as_deref(), Some("/sub"));
    }

    #[test]
    fn test_skips_entries_without_metadata() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["one.txt", "two.txt", "three"] {
            fs::write(temp_dir.path().join(name), name).unwrap();
        }
        for name in ["broken-a", "broken-b"] {
            fs::write(temp_dir.path().join(name), name).unwrap();
        }

        let resolver = resolver_for(temp_dir.path());
        let lister = DirectoryLister::with_reader(FailingReader, ListOptions::default());
        let listing = lister.list(&resolver.resolve("/").unwrap()).unwrap();

        assert_eq!(listing.entries.len(), 3);
        assert!(listing.entries.iter().all(|e| !e.name.starts_with("broken")));
    }

    #[cfg(unix)]
    #[test]
    fn test_skips_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("good.txt"), "ok").unwrap();
        fs::write(temp_dir.path().join(OsStr::from_bytes(b"bad\xff.txt")), "bad").unwrap();

        let resolver = resolver_for(temp_dir.path());
        let lister = DirectoryLister::new(ListOptions::default());
        let listing = lister.list(&resolver.resolve("/").unwrap()).unwrap();

        let paths: Vec<&str> = listing.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/good.txt"]);
    }

    #[test]
    fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();

        let resolver = resolver_for(temp_dir.path());
        let result = DirectoryLister::new(ListOptions::default()).list(&resolver.resolve("/missing").unwrap());
        assert!(matches!(result, Err(EngineError::NotFound(_))));
    }

    #[test]
    fn test_not_a_directory() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("file.txt"), "Hello").unwrap();

        let resolver = resolver_for(temp_dir.path());
        let result = DirectoryLister::new(ListOptions::default()).list(&resolver.resolve("/file.txt").unwrap());
        assert!(matches!(result, Err(EngineError::NotDirectory(_))));
    }

    #[test]
    fn test_directory_sorting() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("zebra.txt"), "z").unwrap();
        fs::write(temp_dir.path().join("Apple.txt"), "a").unwrap();
        fs::write(temp_dir.path().join("banana.txt"), "b").unwrap();
        fs::create_dir_all(temp_dir.path().join("beta_dir")).unwrap();
        fs::create_dir_all(temp_dir.path().join("Alpha_dir")).unwrap();

        let resolver = resolver_for(temp_dir.path());
        let listing = DirectoryLister::new(ListOptions::default())
            .list(&resolver.resolve("/").unwrap())
            .unwrap();

        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Alpha_dir", "beta_dir", "Apple.txt", "banana.txt", "zebra.txt"]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_sorting_tie_breaks_on_exact_name() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("readme"), "b").unwrap();
        fs::write(temp_dir.path().join("README"), "a").unwrap();
        fs::write(temp_dir.path().join("Readme"), "c").unwrap();

        let resolver = resolver_for(temp_dir.path());
        let listing = DirectoryLister::new(ListOptions::default())
            .list(&resolver.resolve("/").unwrap())
            .unwrap();

        let names: Vec<&str> = listing.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README", "Readme", "readme"]);
    }

    #[test]
    fn test_child_request_path() {
        assert_eq!(child_request_path("/", "a.txt"), "/a.txt");
        assert_eq!(child_request_path("/docs", "a.txt"), "/docs/a.txt");
    }

    #[test]
    fn test_modified_display_format() {
        let entry = EntryDescriptor {
            name: "a.txt".to_string(),
            size: Some(1),
            modified: DateTime::from_timestamp(1_704_067_200, 0).unwrap(),
            is_dir: false,
            path: "/a.txt".to_string(),
            size_display: Some("1 B".to_string()),
        };

        let display = entry.modified_display();
        // Local timezone varies; the shape does not.
        assert_eq!(display.len(), "2024-01-01 00:00".len());
        assert_eq!(&display[4..5], "-");
        assert_eq!(&display[10..11], " ");
    }

    #[test]
    fn test_listing_serializes() {
        let listing = ListingResult {
            path: "/".to_string(),
            entries: vec![EntryDescriptor {
                name: "sub".to_string(),
                size: None,
                modified: DateTime::from_timestamp(0, 0).unwrap(),
                is_dir: true,
                path: "/sub".to_string(),
                size_display: None,
            }],
            parent: None,
        };

        let json = serde_json::to_value(&listing).unwrap();
        assert_eq!(json["path"], "/");
        assert_eq!(json["entries"][0]["name"], "sub");
        assert_eq!(json["entries"][0]["is_dir"], true);
        assert!(json["entries"][0]["size"].is_null());
        assert!(json["parent"].is_null());
    }
}
