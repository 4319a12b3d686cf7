//! # Dirshare Engine
//!
//! Path confinement and directory listing for the Dirshare file server.
//!
//! ## Overview
//!
//! The engine turns an untrusted, slash-separated request path into
//! something safe to hand to a renderer or a byte streamer:
//!
//! - **Resolution**: join the request path onto the [`ConfinedRoot`] and
//!   reject anything that would land outside it
//! - **Listing**: enumerate a directory's children into [`EntryDescriptor`]s
//! - **Navigation**: compute the "up" link for a request path
//! - **Sizes**: format byte counts for display
//!
//! ```text
//! request path ──► PathResolver ──► DirectoryLister ──► ListingResult
//!                       │                  │
//!                       │                  └── parent_of, format_size
//!                       └──► ResolvedPath (for download / preview)
//! ```
//!
//! Nothing here holds state between calls. The root is fixed once at startup
//! and shared read-only by every request.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use engine::{ConfinedRoot, DirectoryLister, ListOptions, PathResolver};
//!
//! let resolver = PathResolver::new(ConfinedRoot::new("/srv/share", "/"));
//! let lister = DirectoryLister::new(ListOptions::default());
//!
//! let dir = resolver.resolve("/docs").unwrap();
//! let listing = lister.list(&dir).unwrap();
//! for entry in &listing.entries {
//!     println!("{} {}", entry.name, entry.size_display.as_deref().unwrap_or("-"));
//! }
//! ```
//!
//! ## Modules
//!
//! - [`resolver`]: root confinement
//! - [`lister`]: directory enumeration
//! - [`navigation`]: parent links
//! - [`size`]: byte formatting
//! - [`error`]: error types and status mapping

pub mod error;
pub mod lister;
pub mod navigation;
pub mod resolver;
pub mod size;

pub use error::{EngineError, Result};
pub use lister::{
    child_request_path, DirectoryLister, EntryDescriptor, FsMetadata, ListOptions, ListingResult,
    MetadataReader, MODIFIED_FORMAT,
};
pub use navigation::parent_of;
pub use resolver::{normalize_request_path, ConfinedRoot, PathResolver, ResolvedPath};
pub use size::format_size;
