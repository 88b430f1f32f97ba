//! Wire types for the Directory Service API.

use serde::{Deserialize, Serialize};

/// Page-size ceiling imposed by the directory's list endpoints. A listing
/// that returns exactly this many rows may be truncated.
pub const DIRECTORY_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Pending,
}

impl MembershipStatus {
    pub fn is_active(self) -> bool {
        matches!(self, MembershipStatus::Active)
    }
}

/// One user's membership of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryMembership {
    pub user_id: String,
    pub status: MembershipStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Response envelope of the membership list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListMembershipsResponse {
    pub data: Vec<DirectoryMembership>,
}

/// Error body returned by the directory on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct DirectoryErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
