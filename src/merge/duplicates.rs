//! Duplicate organization candidate detection.
//!
//! Read-only scans over the organization table grouping by normalized name
//! or by claimed email domain. Groups are merge candidates for the
//! preview/execute flow; nothing here writes.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::database::organization_repository::OrganizationRepository;
use crate::error::MergeError;
use crate::merge::types::OrgSummary;

static DOMAIN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]*\.[a-z]{2,}$").unwrap());

/// Organizations sharing a normalized name or a claimed domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// The normalized name or domain the group shares.
    pub key: String,
    /// Group members, ordered by organization id.
    pub organizations: Vec<OrgSummary>,
}

pub struct DuplicateFinder {
    repo: OrganizationRepository,
}

impl DuplicateFinder {
    pub fn new(repo: OrganizationRepository) -> Self {
        Self { repo }
    }

    /// Group non-personal organizations by case-insensitive normalized name.
    pub async fn find_by_name(&self) -> Result<Vec<DuplicateGroup>, MergeError> {
        let orgs = self.repo.list_for_name_scan().await?;
        let keyed = orgs
            .into_iter()
            .map(|org| (normalize_name(&org.name), org));
        Ok(group_duplicates(keyed))
    }

    /// Group organizations by claimed email domain. Claims that do not look
    /// like a domain are ignored rather than grouped.
    pub async fn find_by_domain(&self) -> Result<Vec<DuplicateGroup>, MergeError> {
        let claims = self.repo.list_domain_claims().await?;
        let keyed = claims
            .into_iter()
            .filter_map(|(domain, org)| normalize_domain(&domain).map(|key| (key, org)));
        Ok(group_duplicates(keyed))
    }
}

/// Normalize an organization name for duplicate grouping: NFKC fold,
/// lowercase, punctuation stripped, whitespace collapsed. "ACME INC." and
/// "Acme Inc" normalize to the same key.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .nfkc()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a claimed domain; None when the claim does not look like one.
pub fn normalize_domain(domain: &str) -> Option<String> {
    let lowered = domain.trim().to_lowercase();
    let stripped = lowered.strip_prefix("www.").unwrap_or(&lowered);
    if DOMAIN_PATTERN.is_match(stripped) {
        Some(stripped.to_string())
    } else {
        None
    }
}

/// Group keyed organizations, keep groups with more than one member, and
/// order deterministically: group size descending, then key ascending.
fn group_duplicates<I>(keyed: I) -> Vec<DuplicateGroup>
where
    I: IntoIterator<Item = (String, OrgSummary)>,
{
    let mut by_key: BTreeMap<String, Vec<OrgSummary>> = BTreeMap::new();
    for (key, org) in keyed {
        if key.is_empty() {
            continue;
        }
        by_key.entry(key).or_default().push(org);
    }

    let mut groups: Vec<DuplicateGroup> = by_key
        .into_iter()
        .filter(|(_, orgs)| orgs.len() > 1)
        .map(|(key, mut organizations)| {
            organizations.sort_by(|a, b| a.id.cmp(&b.id));
            DuplicateGroup { key, organizations }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.organizations
            .len()
            .cmp(&a.organizations.len())
            .then_with(|| a.key.cmp(&b.key))
    });
    groups
}
