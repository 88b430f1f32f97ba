//! Merge plan builder: side-effect-free preview of a merge.
//!
//! Estimates dependent-row movement, classifies the billing conflict, and
//! makes a best-effort directory check. No write path exists here; the
//! directory check is advisory and its failure degrades into a warning.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::database::organization_repository::{OrganizationRecord, OrganizationRepository};
use crate::directory::client::{DirectoryApi, DirectoryError};
use crate::directory::types::{DirectoryMembership, DIRECTORY_PAGE_LIMIT};
use crate::error::MergeError;
use crate::merge::resolver::classify_conflict;
use crate::merge::types::{EstimatedChange, MergePlan, OrgSummary};

pub struct MergePlanBuilder {
    repo: OrganizationRepository,
    directory: Arc<dyn DirectoryApi>,
}

impl MergePlanBuilder {
    pub fn new(repo: OrganizationRepository, directory: Arc<dyn DirectoryApi>) -> Self {
        Self { repo, directory }
    }

    pub async fn build(
        &self,
        primary_id: &str,
        secondary_id: &str,
    ) -> Result<MergePlan, MergeError> {
        if primary_id == secondary_id {
            return Err(MergeError::Validation(
                "primary and secondary organization ids must differ".to_string(),
            ));
        }

        let primary = self.load(primary_id).await?;
        let secondary = self.load(secondary_id).await?;

        let mut warnings = Vec::new();

        let counts = self.repo.count_dependent_rows(secondary_id).await?;
        let estimated_changes = counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(table, count)| EstimatedChange {
                table: table.to_string(),
                rows_to_move: count,
            })
            .collect();

        let billing_conflict = classify_conflict(
            primary.billing_customer_id.as_deref(),
            secondary.billing_customer_id.as_deref(),
        );

        let mut directory_check_failed = false;
        let mut directory_migration_estimate = 0;
        match self.list_both_memberships(primary_id, secondary_id).await {
            Ok((primary_members, secondary_members)) => {
                push_page_limit_warning(&mut warnings, primary_id, primary_members.len());
                push_page_limit_warning(&mut warnings, secondary_id, secondary_members.len());
                directory_migration_estimate =
                    missing_active_members(&primary_members, &secondary_members).len();
            }
            Err(err) => {
                warn!(error = %err, primary_id, secondary_id, "directory membership check failed during merge preview");
                directory_check_failed = true;
                warnings.push(format!(
                    "directory membership check failed ({err}); migration estimate unavailable"
                ));
            }
        }

        Ok(MergePlan {
            primary_org: OrgSummary {
                id: primary.org_id,
                name: primary.name,
            },
            secondary_org: OrgSummary {
                id: secondary.org_id,
                name: secondary.name,
            },
            estimated_changes,
            billing_conflict,
            directory_migration_estimate,
            directory_check_failed,
            warnings,
        })
    }

    async fn load(&self, org_id: &str) -> Result<OrganizationRecord, MergeError> {
        self.repo
            .get_organization(org_id)
            .await?
            .ok_or_else(|| MergeError::OrganizationNotFound {
                org_id: org_id.to_string(),
            })
    }

    async fn list_both_memberships(
        &self,
        primary_id: &str,
        secondary_id: &str,
    ) -> Result<(Vec<DirectoryMembership>, Vec<DirectoryMembership>), DirectoryError> {
        let primary = self.directory.list_memberships(primary_id).await?;
        let secondary = self.directory.list_memberships(secondary_id).await?;
        Ok((primary, secondary))
    }
}

/// Active memberships on the secondary whose user is absent from the
/// primary. The executor uses the same set difference when migrating.
pub(crate) fn missing_active_members<'a>(
    primary: &[DirectoryMembership],
    secondary: &'a [DirectoryMembership],
) -> Vec<&'a DirectoryMembership> {
    let on_primary: HashSet<&str> = primary.iter().map(|m| m.user_id.as_str()).collect();
    secondary
        .iter()
        .filter(|m| m.status.is_active() && !on_primary.contains(m.user_id.as_str()))
        .collect()
}

fn push_page_limit_warning(warnings: &mut Vec<String>, org_id: &str, count: usize) {
    if count >= DIRECTORY_PAGE_LIMIT {
        warnings.push(format!(
            "organization {org_id} has {DIRECTORY_PAGE_LIMIT} or more directory members; \
             the membership listing is truncated and manual directory follow-up may be needed"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::types::MembershipStatus;

    fn member(user_id: &str, status: MembershipStatus) -> DirectoryMembership {
        DirectoryMembership {
            user_id: user_id.to_string(),
            status,
            role: None,
        }
    }

    #[test]
    fn set_difference_ignores_inactive_and_shared_members() {
        let primary = vec![member("user_1", MembershipStatus::Active)];
        let secondary = vec![
            member("user_1", MembershipStatus::Active),
            member("user_2", MembershipStatus::Active),
            member("user_3", MembershipStatus::Inactive),
            member("user_4", MembershipStatus::Pending),
        ];

        let missing = missing_active_members(&primary, &secondary);
        let ids: Vec<&str> = missing.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["user_2"]);
    }

    #[test]
    fn empty_primary_takes_every_active_member() {
        let secondary = vec![
            member("user_1", MembershipStatus::Active),
            member("user_2", MembershipStatus::Active),
        ];
        assert_eq!(missing_active_members(&[], &secondary).len(), 2);
    }

    #[test]
    fn page_ceiling_produces_a_warning() {
        let mut warnings = Vec::new();
        push_page_limit_warning(&mut warnings, "org_big", DIRECTORY_PAGE_LIMIT);
        push_page_limit_warning(&mut warnings, "org_small", DIRECTORY_PAGE_LIMIT - 1);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("org_big"));
    }
}
