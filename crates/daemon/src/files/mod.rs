//! File access for the HTTP handlers.
//!
//! Listing and path confinement live in the `engine` crate. This module
//! covers the part that needs the async runtime: opening confined files so
//! their bytes can be streamed for download or inline preview.
//!
//! # Security
//!
//! Only [`engine::ResolvedPath`] values are accepted, so every open goes
//! through the engine's confinement check first.

pub mod access;

pub use access::{
    content_disposition, http_date, Disposition, FileAccessor, OpenedFile, OCTET_STREAM,
};
