//! Directory Service integration
//!
//! The external system of record for organization membership and
//! organization deletion. The merge engine consumes three operations:
//! list memberships, add a membership, delete an organization.

pub mod client;
pub mod types;

pub use client::{DirectoryApi, DirectoryClient, DirectoryError};
pub use types::{DirectoryMembership, MembershipStatus, DIRECTORY_PAGE_LIMIT};
