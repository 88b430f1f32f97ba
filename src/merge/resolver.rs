//! Billing-customer conflict resolution.
//!
//! Pure functions with no I/O. Both Preview and Execute route ownership
//! decisions through here so the two can never disagree about what a given
//! policy does.

use super::types::{BillingConflict, BillingCustomerAction, ResolutionPolicy};

/// Outcome of resolving billing-customer ownership for a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingResolution {
    /// Both sides own a customer and no policy was supplied; the caller
    /// must resupply one of the three policies.
    PolicyRequired {
        primary_customer_id: String,
        secondary_customer_id: String,
    },
    Resolved {
        action: BillingCustomerAction,
        /// Customer id the surviving organization ends up with.
        surviving_customer_id: Option<String>,
        /// Customer ids left without an owning organization after the
        /// merge. Surfaced as warnings for manual relinking.
        orphaned_customer_ids: Vec<String>,
    },
}

/// Classify the billing-customer ownership state of a prospective merge.
///
/// `requires_resolution` reflects what Execute will demand when called
/// without a policy.
pub fn classify_conflict(
    primary_customer_id: Option<&str>,
    secondary_customer_id: Option<&str>,
) -> BillingConflict {
    let has_conflict = primary_customer_id.is_some() && secondary_customer_id.is_some();
    BillingConflict {
        has_conflict,
        primary_customer_id: primary_customer_id.map(str::to_owned),
        secondary_customer_id: secondary_customer_id.map(str::to_owned),
        requires_resolution: has_conflict,
    }
}

/// Map billing-customer ownership plus an optional policy to the required
/// action.
///
/// A policy is consulted only when both sides own a customer; with one or
/// zero owners the resolution is deterministic.
pub fn resolve(
    primary_customer_id: Option<&str>,
    secondary_customer_id: Option<&str>,
    policy: Option<ResolutionPolicy>,
) -> BillingResolution {
    match (primary_customer_id, secondary_customer_id) {
        (None, None) => BillingResolution::Resolved {
            action: BillingCustomerAction::None,
            surviving_customer_id: None,
            orphaned_customer_ids: Vec::new(),
        },
        (Some(primary), None) => BillingResolution::Resolved {
            action: BillingCustomerAction::KeptPrimary,
            surviving_customer_id: Some(primary.to_owned()),
            orphaned_customer_ids: Vec::new(),
        },
        (None, Some(secondary)) => BillingResolution::Resolved {
            action: BillingCustomerAction::MovedFromSecondary,
            surviving_customer_id: Some(secondary.to_owned()),
            orphaned_customer_ids: Vec::new(),
        },
        (Some(primary), Some(secondary)) => match policy {
            None => BillingResolution::PolicyRequired {
                primary_customer_id: primary.to_owned(),
                secondary_customer_id: secondary.to_owned(),
            },
            Some(ResolutionPolicy::KeepPrimary) => BillingResolution::Resolved {
                action: BillingCustomerAction::KeptPrimary,
                surviving_customer_id: Some(primary.to_owned()),
                orphaned_customer_ids: vec![secondary.to_owned()],
            },
            Some(ResolutionPolicy::UseSecondary) => BillingResolution::Resolved {
                action: BillingCustomerAction::MovedFromSecondary,
                surviving_customer_id: Some(secondary.to_owned()),
                orphaned_customer_ids: vec![primary.to_owned()],
            },
            // The only policy that discards both automatic associations.
            Some(ResolutionPolicy::KeepBothUnlinked) => BillingResolution::Resolved {
                action: BillingCustomerAction::ConflictUnresolved,
                surviving_customer_id: None,
                orphaned_customer_ids: vec![primary.to_owned(), secondary.to_owned()],
            },
        },
    }
}
