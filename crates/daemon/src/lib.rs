//! # Dirshare Daemon Library
//!
//! Serves one directory tree over HTTP so other machines on the network can
//! browse it and download files.
//!
//! ## Overview
//!
//! The daemon is a thin HTTP layer over the [`engine`] crate:
//!
//! - **Configuration**: TOML file, environment and CLI overrides
//! - **Routing**: axum handlers for the listing page, JSON listing, download
//!   and preview
//! - **File Access**: streaming confined files with the right headers
//! - **Presentation**: the HTML listing page and its links
//! - **Network**: LAN address discovery for the startup banner
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    axum Router + TraceLayer                │
//! ├───────────────────────────────────────────────────────────┤
//! │  /browse  /api/browse        │  /download  /view          │
//! │         │                    │        │                    │
//! │         ▼                    │        ▼                    │
//! │  DirectoryLister ─► ui::page │  FileAccessor ─► stream     │
//! ├───────────────────────────────────────────────────────────┤
//! │             PathResolver (shared ConfinedRoot)             │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use daemon::{build_router, AppState};
//! use engine::{ConfinedRoot, ListOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let state = AppState::new(ConfinedRoot::new("share", "/srv"), ListOptions::default());
//!     let app = build_router(Arc::new(state));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`files`]: Opening files for download and preview
//! - [`network`]: Local address discovery
//! - [`router`]: HTTP routes and error responses
//! - [`ui`]: HTML rendering

pub mod config;
pub mod files;
pub mod network;
pub mod router;
pub mod ui;

pub use config::{Config, ConfigError, EnvOverride};
pub use files::{FileAccessor, OpenedFile};
pub use router::{build_router, ApiError, AppState};
