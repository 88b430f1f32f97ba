//! Shared types for the merge engine: conflicts, policies, plans, results.
//!
//! Plans and results are ephemeral: computed, returned and logged, never
//! persisted.

use serde::{Deserialize, Serialize};

/// Minimal organization projection used in plans and duplicate groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSummary {
    pub id: String,
    pub name: String,
}

/// Billing-customer ownership state across the two organizations of a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConflict {
    pub has_conflict: bool,
    pub primary_customer_id: Option<String>,
    pub secondary_customer_id: Option<String>,
    /// True when execute will refuse to run without a resolution policy.
    pub requires_resolution: bool,
}

/// Admin-supplied strategy for a billing-customer ownership conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// The primary keeps its customer; the secondary's is orphaned.
    KeepPrimary,
    /// The secondary's customer moves to the primary; the primary's prior
    /// customer is orphaned.
    UseSecondary,
    /// Both customer ids are cleared for manual relinking.
    KeepBothUnlinked,
}

/// What happened to the billing-customer association during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCustomerAction {
    None,
    KeptPrimary,
    MovedFromSecondary,
    ConflictUnresolved,
}

/// Estimated dependent-row movement for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimatedChange {
    pub table: String,
    pub rows_to_move: i64,
}

/// Side-effect-free preview of a merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergePlan {
    pub primary_org: OrgSummary,
    pub secondary_org: OrgSummary,
    /// Tables with at least one row keyed to the secondary.
    pub estimated_changes: Vec<EstimatedChange>,
    pub billing_conflict: BillingConflict,
    /// Active secondary memberships that would be added to the primary.
    pub directory_migration_estimate: usize,
    /// Set when the directory could not be consulted; the estimate is then
    /// zero and the preview carries a warning instead of failing.
    pub directory_check_failed: bool,
    pub warnings: Vec<String>,
}

/// Per-table outcome of the local row migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMergeOutcome {
    pub table: String,
    pub rows_moved: u64,
    /// Rows whose per-organization unique key already existed on the
    /// primary; dropped with the secondary, never duplicated.
    pub rows_skipped_duplicate: u64,
}

/// Audit record of an executed merge. Every registered dependent table
/// appears in `tables_merged`, zero rows included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeResult {
    pub primary_org_id: String,
    pub secondary_org_id: String,
    pub tables_merged: Vec<TableMergeOutcome>,
    pub billing_customer_action: BillingCustomerAction,
    pub prospect_notes_merged: bool,
    pub enrichment_data_preserved: bool,
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_policy_uses_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ResolutionPolicy::KeepBothUnlinked).unwrap();
        assert_eq!(json, "\"keep_both_unlinked\"");

        let parsed: ResolutionPolicy = serde_json::from_str("\"use_secondary\"").unwrap();
        assert_eq!(parsed, ResolutionPolicy::UseSecondary);
    }

    #[test]
    fn billing_action_serializes_snake_case() {
        let json = serde_json::to_string(&BillingCustomerAction::MovedFromSecondary).unwrap();
        assert_eq!(json, "\"moved_from_secondary\"");
    }
}
