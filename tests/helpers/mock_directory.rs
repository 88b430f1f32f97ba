//! In-memory directory service for exercising the merge engine without the
//! network. Failures are scriptable per organization so tests can drive the
//! warn paths of the executor pipeline.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use org_admin::directory::{
    DirectoryApi, DirectoryError, DirectoryMembership, MembershipStatus,
};

#[derive(Default)]
struct MockState {
    memberships: HashMap<String, Vec<DirectoryMembership>>,
    deleted: HashSet<String>,
    fail_listing_for: HashSet<String>,
    fail_deletion_for: HashSet<String>,
}

#[derive(Default)]
pub struct MockDirectory {
    state: Mutex<MockState>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_members(self, org_id: &str, members: &[(&str, MembershipStatus)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let list = state.memberships.entry(org_id.to_string()).or_default();
            for (user_id, status) in members {
                list.push(DirectoryMembership {
                    user_id: user_id.to_string(),
                    status: *status,
                    role: None,
                });
            }
        }
        self
    }

    /// Make `list_memberships` fail for one organization.
    pub fn fail_listing(self, org_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_listing_for
            .insert(org_id.to_string());
        self
    }

    /// Make `delete_organization` fail for one organization.
    pub fn fail_deletion(self, org_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fail_deletion_for
            .insert(org_id.to_string());
        self
    }

    pub fn member_ids_of(&self, org_id: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .memberships
            .get(org_id)
            .map(|members| members.iter().map(|m| m.user_id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn was_deleted(&self, org_id: &str) -> bool {
        self.state.lock().unwrap().deleted.contains(org_id)
    }
}

#[async_trait]
impl DirectoryApi for MockDirectory {
    async fn list_memberships(
        &self,
        org_id: &str,
    ) -> Result<Vec<DirectoryMembership>, DirectoryError> {
        let state = self.state.lock().unwrap();
        if state.fail_listing_for.contains(org_id) {
            return Err(DirectoryError::Api {
                status: 503,
                message: "membership listing unavailable".to_string(),
            });
        }
        Ok(state.memberships.get(org_id).cloned().unwrap_or_default())
    }

    async fn add_membership(
        &self,
        user_id: &str,
        org_id: &str,
        role: Option<&str>,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        let members = state.memberships.entry(org_id.to_string()).or_default();
        if members.iter().any(|m| m.user_id == user_id) {
            return Err(DirectoryError::MembershipExists);
        }
        members.push(DirectoryMembership {
            user_id: user_id.to_string(),
            status: MembershipStatus::Active,
            role: role.map(str::to_owned),
        });
        Ok(())
    }

    async fn delete_organization(&self, org_id: &str) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_deletion_for.contains(org_id) {
            return Err(DirectoryError::Api {
                status: 500,
                message: "deletion rejected".to_string(),
            });
        }
        state.memberships.remove(org_id);
        state.deleted.insert(org_id.to_string());
        Ok(())
    }
}
