//! Merge executor: the only component in the engine with side effects.
//!
//! A merge runs as an ordered pipeline of steps, each classified
//! abort-or-warn. The local row migration commits in a single transaction
//! before any external system is touched; directory work after that point
//! degrades into warnings because the local merge can no longer be rolled
//! back.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::dependent_tables::DEPENDENT_TABLES;
use crate::database::organization_repository::{OrganizationRecord, OrganizationRepository};
use crate::directory::client::{DirectoryApi, DirectoryError};
use crate::directory::types::DirectoryMembership;
use crate::error::MergeError;
use crate::merge::preview::missing_active_members;
use crate::merge::resolver::{resolve, BillingResolution};
use crate::merge::types::{
    BillingCustomerAction, MergeResult, ResolutionPolicy, TableMergeOutcome,
};

/// Ordered steps of a merge. `LocalCommit` is the point of no return: its
/// failure aborts the whole operation, while every directory step degrades
/// into a warning on the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStep {
    DirectorySnapshot,
    LocalCommit,
    DirectorySync,
    DirectoryDelete,
}

impl MergeStep {
    pub const PIPELINE: [MergeStep; 4] = [
        MergeStep::DirectorySnapshot,
        MergeStep::LocalCommit,
        MergeStep::DirectorySync,
        MergeStep::DirectoryDelete,
    ];

    /// Whether a failure of this step aborts the merge instead of being
    /// recorded as a warning.
    pub fn aborts_on_failure(self) -> bool {
        matches!(self, MergeStep::LocalCommit)
    }
}

/// Outcome of the local transaction, carried into the result.
struct LocalOutcome {
    tables: Vec<TableMergeOutcome>,
    prospect_notes_merged: bool,
    enrichment_data_preserved: bool,
}

struct ResolvedBilling {
    action: BillingCustomerAction,
    surviving_customer_id: Option<String>,
    orphaned_customer_ids: Vec<String>,
}

pub struct MergeExecutor {
    repo: OrganizationRepository,
    directory: Arc<dyn DirectoryApi>,
}

impl MergeExecutor {
    pub fn new(repo: OrganizationRepository, directory: Arc<dyn DirectoryApi>) -> Self {
        Self { repo, directory }
    }

    /// Consolidate `secondary_id` into `primary_id`.
    ///
    /// Preconditions are checked before any side effect: the ids must
    /// differ, both organizations must exist, and a billing conflict must
    /// come with a resolution policy. After the local transaction commits,
    /// nothing can fail the merge anymore; directory problems surface in
    /// `MergeResult::warnings`.
    pub async fn execute(
        &self,
        primary_id: &str,
        secondary_id: &str,
        policy: Option<ResolutionPolicy>,
        actor: &str,
    ) -> Result<MergeResult, MergeError> {
        if primary_id == secondary_id {
            return Err(MergeError::Validation(
                "primary and secondary organization ids must differ".to_string(),
            ));
        }

        let primary = self.load(primary_id).await?;
        let secondary = self.load(secondary_id).await?;

        let billing = match resolve(
            primary.billing_customer_id.as_deref(),
            secondary.billing_customer_id.as_deref(),
            policy,
        ) {
            BillingResolution::PolicyRequired {
                primary_customer_id,
                secondary_customer_id,
            } => {
                return Err(MergeError::ResolutionRequired {
                    primary_customer_id,
                    secondary_customer_id,
                })
            }
            BillingResolution::Resolved {
                action,
                surviving_customer_id,
                orphaned_customer_ids,
            } => ResolvedBilling {
                action,
                surviving_customer_id,
                orphaned_customer_ids,
            },
        };

        let audit_id = Uuid::new_v4();
        info!(%audit_id, primary_id, secondary_id, actor, "starting organization merge");

        let mut warnings: Vec<String> = billing
            .orphaned_customer_ids
            .iter()
            .map(|customer_id| {
                format!(
                    "billing customer {customer_id} is left without an owning organization \
                     and must be relinked manually"
                )
            })
            .collect();

        let mut snapshot: Option<Vec<DirectoryMembership>> = None;
        let mut local: Option<LocalOutcome> = None;

        for step in MergeStep::PIPELINE {
            match step {
                MergeStep::DirectorySnapshot => {
                    match self.directory.list_memberships(secondary_id).await {
                        Ok(members) => snapshot = Some(members),
                        Err(err) => degrade(step, &err, secondary_id, &mut warnings),
                    }
                }
                MergeStep::LocalCommit => {
                    // The one abort-tagged step: `?` propagates and nothing
                    // external has been mutated yet.
                    local = Some(self.commit_local(&primary, &secondary, &billing).await?);
                }
                MergeStep::DirectorySync => match snapshot.as_deref() {
                    Some(members) => {
                        sync_memberships(
                            self.directory.as_ref(),
                            primary_id,
                            members,
                            &mut warnings,
                        )
                        .await;
                    }
                    // Snapshot failed; the warning is already recorded.
                    None => {}
                },
                MergeStep::DirectoryDelete => {
                    match self.directory.delete_organization(secondary_id).await {
                        Ok(()) => info!(secondary_id, "deleted secondary organization from directory"),
                        Err(err) => degrade(step, &err, secondary_id, &mut warnings),
                    }
                }
            }
        }

        let local = local.unwrap_or(LocalOutcome {
            tables: Vec::new(),
            prospect_notes_merged: false,
            enrichment_data_preserved: false,
        });

        let result = MergeResult {
            primary_org_id: primary_id.to_string(),
            secondary_org_id: secondary_id.to_string(),
            tables_merged: local.tables,
            billing_customer_action: billing.action,
            prospect_notes_merged: local.prospect_notes_merged,
            enrichment_data_preserved: local.enrichment_data_preserved,
            warnings,
        };

        info!(
            %audit_id,
            actor,
            audit = %serde_json::to_string(&result).unwrap_or_default(),
            "organization merge committed"
        );

        Ok(result)
    }

    async fn load(&self, org_id: &str) -> Result<OrganizationRecord, MergeError> {
        self.repo
            .get_organization(org_id)
            .await?
            .ok_or_else(|| MergeError::OrganizationNotFound {
                org_id: org_id.to_string(),
            })
    }

    /// The atomic local step: one transaction moving every dependent row,
    /// merging record-level fields onto the primary, applying the billing
    /// resolution as a field update, and deleting the secondary row.
    async fn commit_local(
        &self,
        primary: &OrganizationRecord,
        secondary: &OrganizationRecord,
        billing: &ResolvedBilling,
    ) -> Result<LocalOutcome, MergeError> {
        let mut tx = self.repo.pool().begin().await?;

        lock_organizations(&mut tx, &primary.org_id, &secondary.org_id).await?;

        let mut tables = Vec::with_capacity(DEPENDENT_TABLES.len());
        for table in DEPENDENT_TABLES {
            let move_sql = table.move_sql();
            let rows_moved = sqlx::query(&move_sql)
                .bind(&primary.org_id)
                .bind(&secondary.org_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            let purge_sql = table.purge_sql();
            let rows_skipped_duplicate = sqlx::query(&purge_sql)
                .bind(&secondary.org_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            tables.push(TableMergeOutcome {
                table: table.table.to_string(),
                rows_moved,
                rows_skipped_duplicate,
            });
        }

        let (prospect_notes, prospect_notes_merged) = merged_prospect_notes(
            primary.prospect_notes.as_deref(),
            secondary.prospect_notes.as_deref(),
        );
        let enrichment = primary
            .enrichment
            .clone()
            .or_else(|| secondary.enrichment.clone());
        let enrichment_data_preserved = enrichment.is_some();
        let discount_percent = primary.discount_percent.or(secondary.discount_percent);
        let pipeline_stage = primary
            .pipeline_stage
            .clone()
            .or_else(|| secondary.pipeline_stage.clone());

        sqlx::query(
            r#"UPDATE org_admin.organizations
               SET billing_customer_id = $2,
                   prospect_notes = $3,
                   enrichment = $4,
                   discount_percent = $5,
                   pipeline_stage = $6,
                   updated_at = now()
               WHERE org_id = $1"#,
        )
        .bind(&primary.org_id)
        .bind(billing.surviving_customer_id.as_deref())
        .bind(prospect_notes.as_deref())
        .bind(&enrichment)
        .bind(discount_percent)
        .bind(pipeline_stage.as_deref())
        .execute(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM org_admin.organizations WHERE org_id = $1")
            .bind(&secondary.org_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            // A concurrent merge won the race after our initial load.
            tx.rollback().await?;
            return Err(MergeError::OrganizationNotFound {
                org_id: secondary.org_id.clone(),
            });
        }

        tx.commit().await?;

        info!(
            primary_id = %primary.org_id,
            secondary_id = %secondary.org_id,
            "local merge transaction committed"
        );

        Ok(LocalOutcome {
            tables,
            prospect_notes_merged,
            enrichment_data_preserved,
        })
    }
}

/// Migrate snapshotted secondary memberships onto the primary, one user at
/// a time. Sequential on purpose: external rate limits, and one error per
/// user. An "already exists" answer is an expected skip; any other per-user
/// failure is counted and the loop continues.
pub(crate) async fn sync_memberships(
    directory: &dyn DirectoryApi,
    primary_id: &str,
    snapshot: &[DirectoryMembership],
    warnings: &mut Vec<String>,
) -> MembershipSyncStats {
    let on_primary = match directory.list_memberships(primary_id).await {
        Ok(members) => members,
        Err(err) => {
            warn!(error = %err, primary_id, "could not list primary memberships before migration");
            warnings.push(format!(
                "could not list primary organization memberships ({err}); \
                 relying on the directory to reject duplicates"
            ));
            Vec::new()
        }
    };

    let mut stats = MembershipSyncStats::default();
    for member in missing_active_members(&on_primary, snapshot) {
        match directory
            .add_membership(&member.user_id, primary_id, member.role.as_deref())
            .await
        {
            Ok(()) => stats.migrated += 1,
            Err(DirectoryError::MembershipExists) => stats.already_present += 1,
            Err(err) => {
                warn!(user_id = %member.user_id, error = %err, "failed to migrate directory membership");
                stats.failed += 1;
            }
        }
    }

    if stats.failed > 0 {
        warnings.push(format!(
            "{} directory membership(s) could not be migrated to {primary_id}; \
             manual directory cleanup required",
            stats.failed
        ));
    }

    info!(
        primary_id,
        migrated = stats.migrated,
        already_present = stats.already_present,
        failed = stats.failed,
        "directory membership migration complete"
    );
    stats
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MembershipSyncStats {
    pub migrated: usize,
    pub already_present: usize,
    pub failed: usize,
}

/// Record a warn-tagged step failure on the result.
fn degrade(step: MergeStep, err: &DirectoryError, secondary_id: &str, warnings: &mut Vec<String>) {
    warn!(?step, error = %err, "merge step degraded to a warning");
    let warning = match step {
        MergeStep::DirectorySnapshot => format!(
            "directory snapshot of {secondary_id} failed ({err}); membership migration skipped"
        ),
        MergeStep::DirectoryDelete => format!(
            "directory deletion of {secondary_id} failed ({err}); a zombie organization \
             remains in the directory and must be removed manually"
        ),
        // Sync and LocalCommit report their own failures.
        MergeStep::DirectorySync | MergeStep::LocalCommit => format!("{step:?} failed ({err})"),
    };
    warnings.push(warning);
}

/// Transaction-scoped advisory locks on both organization ids, taken in
/// lock-key order so concurrent merges over the same pair cannot deadlock.
async fn lock_organizations(
    tx: &mut Transaction<'_, Postgres>,
    primary_id: &str,
    secondary_id: &str,
) -> Result<(), sqlx::Error> {
    let mut keys = [org_lock_key(primary_id), org_lock_key(secondary_id)];
    keys.sort_unstable();
    for key in keys {
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Stable 64-bit advisory-lock key for an organization id.
fn org_lock_key(org_id: &str) -> i64 {
    let digest = Sha256::digest(org_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}

/// Merge prospect notes onto the primary: moved wholesale when the primary
/// has none, appended under a separator when both sides carry notes.
pub(crate) fn merged_prospect_notes(
    primary: Option<&str>,
    secondary: Option<&str>,
) -> (Option<String>, bool) {
    match (primary, secondary) {
        (_, None) => (primary.map(str::to_owned), false),
        (None, Some(secondary)) => (Some(secondary.to_owned()), true),
        (Some(primary), Some(secondary)) => {
            (Some(format!("{primary}\n---\n{secondary}")), true)
        }
    }
}
