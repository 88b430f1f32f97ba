//! Directory Service client
//!
//! Rate-limited HTTP client for the external membership directory. Every
//! operation is independently failable; callers decide whether a failure
//! aborts or degrades into a warning.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::time::sleep;
use tracing::debug;

use super::types::{
    DirectoryErrorBody, DirectoryMembership, ListMembershipsResponse, DIRECTORY_PAGE_LIMIT,
};

const RATE_LIMIT_DELAY_MS: u64 = 100;

#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory configuration error: {0}")]
    Config(String),

    #[error("Directory transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The directory reports the user already belongs to the organization.
    /// Expected during membership migration and treated as a skip.
    #[error("Membership already exists")]
    MembershipExists,

    #[error("Directory API error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// The directory operations the merge engine consumes. A trait seam so the
/// engine can run against an in-memory directory in tests.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Memberships of one organization. Single page, capped at
    /// [`DIRECTORY_PAGE_LIMIT`] rows.
    async fn list_memberships(
        &self,
        org_id: &str,
    ) -> Result<Vec<DirectoryMembership>, DirectoryError>;

    async fn add_membership(
        &self,
        user_id: &str,
        org_id: &str,
        role: Option<&str>,
    ) -> Result<(), DirectoryError>;

    async fn delete_organization(&self, org_id: &str) -> Result<(), DirectoryError>;
}

pub struct DirectoryClient {
    client: Client,
    base_url: String,
    api_key: String,
    last_request: Mutex<Instant>,
}

impl DirectoryClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
            last_request: Mutex::new(Instant::now()),
        })
    }

    /// Build a client from `DIRECTORY_API_URL` and `DIRECTORY_API_KEY`.
    pub fn from_env() -> Result<Self, DirectoryError> {
        let base_url = std::env::var("DIRECTORY_API_URL")
            .map_err(|_| DirectoryError::Config("DIRECTORY_API_URL is not set".to_string()))?;
        let api_key = std::env::var("DIRECTORY_API_KEY")
            .map_err(|_| DirectoryError::Config("DIRECTORY_API_KEY is not set".to_string()))?;
        Self::new(base_url, api_key)
    }

    /// Enforce a minimum delay between requests
    async fn rate_limit(&self) {
        let elapsed = {
            let last = self.last_request.lock().unwrap();
            last.elapsed()
        };

        if elapsed < Duration::from_millis(RATE_LIMIT_DELAY_MS) {
            sleep(Duration::from_millis(RATE_LIMIT_DELAY_MS) - elapsed).await;
        }

        let mut last = self.last_request.lock().unwrap();
        *last = Instant::now();
    }

    /// Map a non-2xx response to a [`DirectoryError::Api`].
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, DirectoryError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body: Option<DirectoryErrorBody> = response.json().await.ok();
        let message = body
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            });

        Err(DirectoryError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl DirectoryApi for DirectoryClient {
    async fn list_memberships(
        &self,
        org_id: &str,
    ) -> Result<Vec<DirectoryMembership>, DirectoryError> {
        self.rate_limit().await;
        let url = format!(
            "{}/organization_memberships?organization_id={}&limit={}",
            self.base_url, org_id, DIRECTORY_PAGE_LIMIT
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let response = Self::check(response).await?;
        let body: ListMembershipsResponse = response.json().await?;

        debug!(org_id, count = body.data.len(), "listed directory memberships");
        Ok(body.data)
    }

    async fn add_membership(
        &self,
        user_id: &str,
        org_id: &str,
        role: Option<&str>,
    ) -> Result<(), DirectoryError> {
        self.rate_limit().await;
        let url = format!("{}/organization_memberships", self.base_url);
        let payload = serde_json::json!({
            "user_id": user_id,
            "organization_id": org_id,
            "role": role,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if response.status() == StatusCode::CONFLICT {
            return Err(DirectoryError::MembershipExists);
        }
        Self::check(response).await?;

        debug!(user_id, org_id, "added directory membership");
        Ok(())
    }

    async fn delete_organization(&self, org_id: &str) -> Result<(), DirectoryError> {
        self.rate_limit().await;
        let url = format!("{}/organizations/{}", self.base_url, org_id);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check(response).await?;

        debug!(org_id, "deleted directory organization");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_stripped_from_the_base_url() {
        let client = DirectoryClient::new("https://directory.example.com///", "sk_test").unwrap();
        assert_eq!(client.base_url, "https://directory.example.com");
    }

    #[test]
    fn membership_exists_is_not_an_api_error() {
        let err = DirectoryError::MembershipExists;
        assert!(matches!(err, DirectoryError::MembershipExists));
        assert_eq!(err.to_string(), "Membership already exists");
    }
}
