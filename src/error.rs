//! Error taxonomy for the organization merge engine.
//!
//! Only caller errors and store failures surface here. Partial failures
//! during a merge (directory snapshot, membership migration, directory
//! deletion) never become errors; they accumulate into the `warnings` list
//! of an otherwise-successful result and must be surfaced verbatim.

use thiserror::Error;

/// Main error type for merge operations
#[derive(Error, Debug)]
pub enum MergeError {
    /// Caller contract violation: identical ids or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An organization id did not resolve in the local store. Also the
    /// expected signal when re-running a merge that already completed.
    #[error("Organization not found: {org_id}")]
    OrganizationNotFound { org_id: String },

    /// Both organizations own a billing customer and no resolution policy
    /// was supplied. Distinct from `Validation` so callers can prompt for
    /// one of the three policies.
    #[error("Billing conflict between '{primary_customer_id}' and '{secondary_customer_id}' requires a resolution policy")]
    ResolutionRequired {
        primary_customer_id: String,
        secondary_customer_id: String,
    },

    /// Store unreachable or a query failed. Aborts before any external
    /// system is mutated.
    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type alias for merge operations
pub type MergeOpResult<T> = Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_required_names_both_customers() {
        let err = MergeError::ResolutionRequired {
            primary_customer_id: "cus_A".to_string(),
            secondary_customer_id: "cus_B".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("cus_A"));
        assert!(message.contains("cus_B"));
    }

    #[test]
    fn not_found_names_the_organization() {
        let err = MergeError::OrganizationNotFound {
            org_id: "org_123".to_string(),
        };
        assert!(err.to_string().contains("org_123"));
    }
}
