//! REST API module for the organization admin engine
//!
//! HTTP endpoints for duplicate detection and the merge preview/execute
//! flow. The surrounding admin tooling defaults to preview-before-execute;
//! the engine itself permits execute without a prior preview call.

#[cfg(feature = "server")]
pub mod merge_routes;

#[cfg(feature = "server")]
pub use merge_routes::{create_merge_router, MergeAppState};
