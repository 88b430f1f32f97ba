//! Organization identity-merge engine.
//!
//! `duplicates` surfaces merge candidates, `resolver` decides
//! billing-customer ownership, `preview` builds a side-effect-free plan,
//! and `executor` performs the consolidation across the local store and
//! the external directory.

pub mod resolver;
pub mod types;

#[cfg(feature = "database")]
pub mod duplicates;
#[cfg(feature = "database")]
pub mod executor;
#[cfg(feature = "database")]
pub mod preview;

pub use resolver::{classify_conflict, resolve, BillingResolution};
pub use types::{
    BillingConflict, BillingCustomerAction, EstimatedChange, MergePlan, MergeResult, OrgSummary,
    ResolutionPolicy, TableMergeOutcome,
};

#[cfg(feature = "database")]
pub use duplicates::{normalize_domain, normalize_name, DuplicateFinder, DuplicateGroup};
#[cfg(feature = "database")]
pub use executor::{MergeExecutor, MergeStep};
#[cfg(feature = "database")]
pub use preview::MergePlanBuilder;
