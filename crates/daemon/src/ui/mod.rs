//! Browser-facing presentation.
//!
//! Renders [`engine::ListingResult`]s as HTML and builds the links between
//! pages. All user-controlled text is escaped and every link path is
//! percent-encoded segment by segment.

pub mod page;

pub use page::{link, render_listing, BROWSE_ROUTE, DOWNLOAD_ROUTE, VIEW_ROUTE};
