//! org-admin - Organization identity management
//!
//! The core of this crate is the identity-merge engine: duplicate candidate
//! detection plus pairwise consolidation of organization records across the
//! relational store, the external membership directory, and the locally
//! cached billing-customer reference. The three systems share no
//! transaction; the engine commits locally first and degrades every later
//! external failure into warnings on the result.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use org_admin::merge::{classify_conflict, resolve, ResolutionPolicy};
//!
//! let conflict = classify_conflict(Some("cus_A"), Some("cus_B"));
//! assert!(conflict.requires_resolution);
//!
//! let resolution = resolve(
//!     Some("cus_A"),
//!     Some("cus_B"),
//!     Some(ResolutionPolicy::KeepPrimary),
//! );
//! let _ = resolution;
//! ```

// Core error handling
pub mod error;

// External directory service client
pub mod directory;

// Merge engine: candidate detection, conflict resolution, preview, execution
pub mod merge;

// Database integration (when enabled)
#[cfg(feature = "database")]
pub mod database;

// REST API (when the server feature is enabled)
#[cfg(feature = "server")]
pub mod api;

// Essential error types
pub use error::{MergeError, MergeOpResult};

// Engine types
pub use merge::{
    BillingConflict, BillingCustomerAction, MergePlan, MergeResult, ResolutionPolicy,
};

// Directory client types
pub use directory::{DirectoryApi, DirectoryClient, DirectoryError};

// Database integration re-exports (when the database feature is enabled)
#[cfg(feature = "database")]
pub use database::{DatabaseConfig, DatabaseManager, OrganizationRepository};
#[cfg(feature = "database")]
pub use merge::{DuplicateFinder, MergeExecutor, MergePlanBuilder};
