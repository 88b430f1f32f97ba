//! Organization repository: typed access to the organization table and the
//! read paths the merge engine builds on (summaries, duplicate scans,
//! dependent-row counting).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};

use super::dependent_tables::DEPENDENT_TABLES;
use crate::merge::types::OrgSummary;

#[derive(Clone)]
pub struct OrganizationRepository {
    pool: PgPool,
}

impl OrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get an organization by its directory-issued id
    pub async fn get_organization(
        &self,
        org_id: &str,
    ) -> Result<Option<OrganizationRecord>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT org_id, name, is_personal, billing_customer_id, discount_percent,
                      pipeline_stage, prospect_notes, enrichment, created_at, updated_at
               FROM org_admin.organizations
               WHERE org_id = $1"#,
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| OrganizationRecord {
            org_id: row.get("org_id"),
            name: row.get("name"),
            is_personal: row.get("is_personal"),
            billing_customer_id: row.get("billing_customer_id"),
            discount_percent: row.get("discount_percent"),
            pipeline_stage: row.get("pipeline_stage"),
            prospect_notes: row.get("prospect_notes"),
            enrichment: row.get("enrichment"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }))
    }

    pub async fn get_summary(&self, org_id: &str) -> Result<Option<OrgSummary>, sqlx::Error> {
        let row = sqlx::query(
            r#"SELECT org_id, name FROM org_admin.organizations WHERE org_id = $1"#,
        )
        .bind(org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| OrgSummary {
            id: row.get("org_id"),
            name: row.get("name"),
        }))
    }

    /// All non-personal organizations, for the duplicate-by-name scan.
    pub async fn list_for_name_scan(&self) -> Result<Vec<OrgSummary>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT org_id, name
               FROM org_admin.organizations
               WHERE NOT is_personal
               ORDER BY org_id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut orgs = Vec::with_capacity(rows.len());
        for row in rows {
            orgs.push(OrgSummary {
                id: row.get("org_id"),
                name: row.get("name"),
            });
        }
        Ok(orgs)
    }

    /// (claimed domain, owning organization) pairs, for the
    /// duplicate-by-domain scan.
    pub async fn list_domain_claims(&self) -> Result<Vec<(String, OrgSummary)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"SELECT dc.domain, o.org_id, o.name
               FROM org_admin.domain_claims dc
               JOIN org_admin.organizations o ON o.org_id = dc.organization_id
               ORDER BY dc.domain, o.org_id"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut claims = Vec::with_capacity(rows.len());
        for row in rows {
            claims.push((
                row.get("domain"),
                OrgSummary {
                    id: row.get("org_id"),
                    name: row.get("name"),
                },
            ));
        }
        Ok(claims)
    }

    /// Per-table counts of dependent rows keyed to an organization.
    pub async fn count_dependent_rows(
        &self,
        org_id: &str,
    ) -> Result<Vec<(&'static str, i64)>, sqlx::Error> {
        let mut counts = Vec::with_capacity(DEPENDENT_TABLES.len());
        for table in DEPENDENT_TABLES {
            let sql = table.count_sql();
            let count = sqlx::query_scalar::<_, i64>(&sql)
                .bind(org_id)
                .fetch_one(&self.pool)
                .await?;
            counts.push((table.table, count));
        }
        Ok(counts)
    }
}

/// Complete organization row. The billing customer id is a locally cached
/// reference; the authoritative copy lives in the billing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub org_id: String,
    pub name: String,
    pub is_personal: bool,
    pub billing_customer_id: Option<String>,
    pub discount_percent: Option<Decimal>,
    pub pipeline_stage: Option<String>,
    pub prospect_notes: Option<String>,
    pub enrichment: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}
