//! Registry of relational tables that hang off an organization.
//!
//! Every table listed here has a foreign key to `organizations.org_id` and
//! a unique key scoped to one organization. The merge engine derives its
//! counting, row-migration and duplicate-skipping SQL from this registry;
//! supporting a new dependent table means adding one entry.

/// A table whose rows reference an organization.
#[derive(Debug, Clone, Copy)]
pub struct DependentTable {
    pub table: &'static str,
    pub fk_column: &'static str,
    /// Unique key columns scoped to one organization. A secondary row that
    /// collides with a primary row on these columns is skipped, not moved.
    pub unique_key: &'static [&'static str],
}

pub const DEPENDENT_TABLES: &[DependentTable] = &[
    DependentTable {
        table: "organization_memberships",
        fk_column: "organization_id",
        unique_key: &["user_id"],
    },
    DependentTable {
        table: "activity_log",
        fk_column: "organization_id",
        unique_key: &["dedupe_key"],
    },
    DependentTable {
        table: "stakeholders",
        fk_column: "organization_id",
        unique_key: &["email"],
    },
    DependentTable {
        table: "domain_claims",
        fk_column: "organization_id",
        unique_key: &["domain"],
    },
    DependentTable {
        table: "discount_grants",
        fk_column: "organization_id",
        unique_key: &["code"],
    },
];

impl DependentTable {
    /// `SELECT COUNT(*)` of rows keyed to an organization. `$1` = org id.
    pub fn count_sql(&self) -> String {
        format!(
            "SELECT COUNT(*) FROM org_admin.{} WHERE {} = $1",
            self.table, self.fk_column
        )
    }

    /// `UPDATE` moving the secondary's rows to the primary, skipping rows
    /// whose unique key already exists on the primary. `$1` = primary id,
    /// `$2` = secondary id.
    pub fn move_sql(&self) -> String {
        if self.unique_key.is_empty() {
            return format!(
                "UPDATE org_admin.{table} SET {fk} = $1 WHERE {fk} = $2",
                table = self.table,
                fk = self.fk_column,
            );
        }

        let collision = self
            .unique_key
            .iter()
            .map(|col| format!("p.{col} = t.{col}"))
            .collect::<Vec<_>>()
            .join(" AND ");

        format!(
            "UPDATE org_admin.{table} AS t SET {fk} = $1 \
             WHERE t.{fk} = $2 \
             AND NOT EXISTS (SELECT 1 FROM org_admin.{table} AS p WHERE p.{fk} = $1 AND {collision})",
            table = self.table,
            fk = self.fk_column,
            collision = collision,
        )
    }

    /// `DELETE` for rows still keyed to the secondary after the move, i.e.
    /// the unique-key collisions. `$1` = secondary id.
    pub fn purge_sql(&self) -> String {
        format!(
            "DELETE FROM org_admin.{} WHERE {} = $1",
            self.table, self.fk_column
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_covers_the_crm_tables() {
        let names: Vec<&str> = DEPENDENT_TABLES.iter().map(|t| t.table).collect();
        assert!(names.contains(&"organization_memberships"));
        assert!(names.contains(&"activity_log"));
        assert!(names.contains(&"stakeholders"));
        assert!(names.contains(&"domain_claims"));
        assert!(names.contains(&"discount_grants"));
    }

    #[test]
    fn move_sql_skips_unique_key_collisions() {
        let activity = DEPENDENT_TABLES
            .iter()
            .find(|t| t.table == "activity_log")
            .copied()
            .unwrap();
        let sql = activity.move_sql();
        assert!(sql.starts_with("UPDATE org_admin.activity_log AS t SET organization_id = $1"));
        assert!(sql.contains("NOT EXISTS"));
        assert!(sql.contains("p.dedupe_key = t.dedupe_key"));
    }

    #[test]
    fn purge_sql_targets_the_secondary_only() {
        let sql = DEPENDENT_TABLES[0].purge_sql();
        assert_eq!(
            sql,
            "DELETE FROM org_admin.organization_memberships WHERE organization_id = $1"
        );
    }
}
