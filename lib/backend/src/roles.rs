//! Role assertions read from the platform's `user_roles` table.

use async_trait::async_trait;
use peoplehub_access::{Role, RoleAssertion, RoleDirectory, RoleLookupError};
use peoplehub_core::{IdentityId, Result};
use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use crate::client::{PlatformClient, read_json};
use crate::error::BackendError;

const USER_ROLES_PATH: &str = "/rest/v1/user_roles";

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: String,
}

/// [`RoleDirectory`] issuing point lookups against the REST interface.
#[derive(Debug, Clone)]
pub struct RestRoleDirectory {
    client: PlatformClient,
    bearer: Option<String>,
}

impl RestRoleDirectory {
    /// Creates a directory authenticating with the platform's server key.
    #[must_use]
    pub fn new(client: PlatformClient) -> Self {
        Self {
            client,
            bearer: None,
        }
    }

    /// Reads as the holder of `access_token`, so row policies apply.
    #[must_use]
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.bearer = Some(access_token.into());
        self
    }

    /// Fetches the `(identity_id, role)` assertion, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the row cannot be decoded.
    #[instrument(skip(self), fields(identity_id = %identity_id, role = %role))]
    pub async fn fetch_assertion(
        &self,
        identity_id: &IdentityId,
        role: Role,
    ) -> Result<Option<RoleAssertion>, BackendError> {
        let bearer = self
            .bearer
            .as_deref()
            .unwrap_or_else(|| self.client.config().server_key());

        let response = self
            .client
            .request(Method::GET, USER_ROLES_PATH)
            .bearer_auth(bearer)
            .query(&[
                ("select", "role".to_string()),
                ("user_id", format!("eq.{}", identity_id)),
                ("role", format!("eq.{}", role)),
                ("limit", "1".to_string()),
            ])
            .send()
            .await
            .map_err(|e| BackendError::request(&e))?;

        let rows: Vec<RoleRow> = read_json(response).await?;
        let Some(row) = rows.into_iter().next() else {
            return Ok(None);
        };
        let role: Role = row.role.parse().map_err(BackendError::decode)?;
        Ok(Some(RoleAssertion::new(identity_id.clone(), role)))
    }
}

#[async_trait]
impl RoleDirectory for RestRoleDirectory {
    async fn find_assertion(
        &self,
        identity_id: &IdentityId,
        role: Role,
    ) -> std::result::Result<Option<RoleAssertion>, RoleLookupError> {
        self.fetch_assertion(identity_id, role)
            .await
            .map_err(|report| RoleLookupError::RequestFailed {
                reason: report.to_string(),
            })
    }
}
