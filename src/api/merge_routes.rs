//! Organization merge API routes
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Liveness probe
//! - `GET /api/organizations/duplicates?by=name|domain` - Merge candidates
//! - `POST /api/organizations/merge/preview` - Side-effect-free merge plan
//! - `POST /api/organizations/merge` - Execute a merge

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::database::organization_repository::OrganizationRepository;
use crate::directory::client::DirectoryApi;
use crate::error::MergeError;
use crate::merge::duplicates::{DuplicateFinder, DuplicateGroup};
use crate::merge::executor::MergeExecutor;
use crate::merge::preview::MergePlanBuilder;
use crate::merge::types::{MergePlan, MergeResult, ResolutionPolicy};

/// Application state for merge routes
#[derive(Clone)]
pub struct MergeAppState {
    pub pool: PgPool,
    pub directory: Arc<dyn DirectoryApi>,
}

/// Create the merge routes router
pub fn create_merge_router(pool: PgPool, directory: Arc<dyn DirectoryApi>) -> Router {
    let state = MergeAppState { pool, directory };

    Router::new()
        .route("/api/health", get(health))
        .route("/api/organizations/duplicates", get(find_duplicates))
        .route("/api/organizations/merge/preview", post(preview_merge))
        .route("/api/organizations/merge", post(execute_merge))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DuplicatesQuery {
    /// Grouping dimension: "name" (default) or "domain".
    #[serde(default = "default_grouping")]
    pub by: String,
}

fn default_grouping() -> String {
    "name".to_string()
}

#[derive(Debug, Serialize)]
pub struct DuplicatesResponse {
    pub groups: Vec<DuplicateGroup>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub primary_org_id: String,
    pub secondary_org_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub primary_org_id: String,
    pub secondary_org_id: String,
    /// Required when both organizations own a billing customer.
    #[serde(default)]
    pub resolution_policy: Option<ResolutionPolicy>,
    /// Acting admin identity, recorded in the audit log.
    pub actor: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/organizations/duplicates
async fn find_duplicates(
    State(state): State<MergeAppState>,
    Query(query): Query<DuplicatesQuery>,
) -> Result<Json<DuplicatesResponse>, (StatusCode, String)> {
    let finder = DuplicateFinder::new(OrganizationRepository::new(state.pool.clone()));

    let groups = match query.by.as_str() {
        "name" => finder.find_by_name().await.map_err(error_response)?,
        "domain" => finder.find_by_domain().await.map_err(error_response)?,
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("unknown duplicate grouping '{other}', expected 'name' or 'domain'"),
            ))
        }
    };

    let total = groups.len();
    Ok(Json(DuplicatesResponse { groups, total }))
}

/// POST /api/organizations/merge/preview
async fn preview_merge(
    State(state): State<MergeAppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<MergePlan>, (StatusCode, String)> {
    let builder = MergePlanBuilder::new(
        OrganizationRepository::new(state.pool.clone()),
        state.directory.clone(),
    );

    let plan = builder
        .build(&request.primary_org_id, &request.secondary_org_id)
        .await
        .map_err(error_response)?;

    Ok(Json(plan))
}

/// POST /api/organizations/merge
async fn execute_merge(
    State(state): State<MergeAppState>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<MergeResult>, (StatusCode, String)> {
    if request.actor.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "actor must identify the acting admin".to_string(),
        ));
    }

    let executor = MergeExecutor::new(
        OrganizationRepository::new(state.pool.clone()),
        state.directory.clone(),
    );

    let result = executor
        .execute(
            &request.primary_org_id,
            &request.secondary_org_id,
            request.resolution_policy,
            &request.actor,
        )
        .await
        .map_err(error_response)?;

    Ok(Json(result))
}

/// Map engine errors onto HTTP statuses. `ResolutionRequired` gets 409 so
/// clients can prompt for a policy and retry.
fn error_response(err: MergeError) -> (StatusCode, String) {
    let status = match &err {
        MergeError::Validation(_) => StatusCode::BAD_REQUEST,
        MergeError::OrganizationNotFound { .. } => StatusCode::NOT_FOUND,
        MergeError::ResolutionRequired { .. } => StatusCode::CONFLICT,
        MergeError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_conflicts_map_to_409() {
        let (status, body) = error_response(MergeError::ResolutionRequired {
            primary_customer_id: "cus_A".to_string(),
            secondary_customer_id: "cus_B".to_string(),
        });
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("cus_A"));
    }

    #[test]
    fn unknown_organizations_map_to_404() {
        let (status, _) = error_response(MergeError::OrganizationNotFound {
            org_id: "org_missing".to_string(),
        });
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_failures_map_to_400() {
        let (status, _) = error_response(MergeError::Validation("same ids".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
