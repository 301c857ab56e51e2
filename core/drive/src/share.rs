//! Public share links: grant, read back, revoke.

use std::sync::Arc;
use tracing::{debug, info, warn};

use drivegate_common::Result;

use crate::client::ApiClient;
use crate::model::{PermissionGrant, PermissionList, ShareLink};

/// What a revocation actually did. Callers of the gateway only see `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revocation {
    /// No "anyone" permission was present; no delete was issued.
    NothingToRevoke,
    /// The delete call succeeded.
    Deleted { permission_id: String },
    /// The delete call was issued but did not succeed.
    DeleteFailed {
        permission_id: String,
        reason: String,
    },
}

/// Grants and revokes "anyone with the link" access.
pub struct ShareLinks {
    api: Arc<ApiClient>,
}

impl ShareLinks {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Grant reader access to anyone, then read back the view link.
    ///
    /// The read-back only happens if the grant succeeded. A failed read-back
    /// leaves the grant in place and returns an empty link.
    ///
    /// # Errors
    /// - Network errors
    pub async fn create(&self, object_id: &str) -> Result<ShareLink> {
        let token = self.api.access_token().await;

        let grant_url = self.api.files_endpoint(&[object_id, "permissions"])?;
        let request = self
            .api
            .http()
            .post(grant_url)
            .json(&PermissionGrant::ANYONE_READER);
        let response = self
            .api
            .send(self.api.authorize(request, &token), "grant permission")
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(object_id, %status, "Permission grant rejected, no share link");
            return Ok(ShareLink::default());
        }

        let link_url = self.api.files_endpoint(&[object_id])?;
        let request = self
            .api
            .http()
            .get(link_url)
            .query(&[("fields", "webViewLink")]);
        let response = self
            .api
            .send(self.api.authorize(request, &token), "read share link")
            .await?;

        let link: ShareLink = self.api.decode_or_default(response, "read share link").await?;
        if link.is_empty() {
            warn!(object_id, "Permission granted but no view link returned");
        } else {
            info!(object_id, "Share link created");
        }
        Ok(link)
    }

    /// Delete the first "anyone" permission on the object.
    ///
    /// Failure of the delete call itself is reported in the result, never
    /// as an error.
    ///
    /// # Errors
    /// - Network errors on the permission lookup
    pub async fn revoke(&self, object_id: &str) -> Result<Revocation> {
        let token = self.api.access_token().await;

        let list_url = self.api.files_endpoint(&[object_id, "permissions"])?;
        let request = self.api.http().get(list_url);
        let response = self
            .api
            .send(self.api.authorize(request, &token), "list permissions")
            .await?;
        let permissions: PermissionList =
            self.api.decode_or_default(response, "list permissions").await?;

        let Some(permission) = permissions.first_anyone() else {
            debug!(object_id, "No public permission to revoke");
            return Ok(Revocation::NothingToRevoke);
        };
        let permission_id = permission.id.clone();

        let delete_url = self
            .api
            .files_endpoint(&[object_id, "permissions", permission_id.as_str()])?;
        let request = self.api.http().delete(delete_url);
        let result = self
            .api
            .send(self.api.authorize(request, &token), "delete permission")
            .await;

        let revocation = match result {
            Ok(response) if response.status().is_success() => {
                info!(object_id, permission_id = %permission_id, "Share link revoked");
                Revocation::Deleted { permission_id }
            }
            Ok(response) => {
                let reason = format!("status {}", response.status());
                warn!(
                    object_id,
                    permission_id = %permission_id,
                    %reason,
                    "Permission delete failed"
                );
                Revocation::DeleteFailed {
                    permission_id,
                    reason,
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(
                    object_id,
                    permission_id = %permission_id,
                    %reason,
                    "Permission delete failed"
                );
                Revocation::DeleteFailed {
                    permission_id,
                    reason,
                }
            }
        };

        Ok(revocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mount_token, test_api};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_grants_then_reads_link() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/drive/v3/files/f1/permissions"))
            .and(body_json(serde_json::json!({"role": "reader", "type": "anyone"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kind": "drive#permission",
                "id": "anyoneWithLink",
                "type": "anyone",
                "role": "reader"
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1"))
            .and(query_param("fields", "webViewLink"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "webViewLink": "https://drive.example/file/d/f1/view"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let link = ShareLinks::new(test_api(&server)).create("f1").await.unwrap();
        assert_eq!(
            link.web_view_link.as_deref(),
            Some("https://drive.example/file/d/f1/view")
        );
    }

    #[tokio::test]
    async fn test_create_rejected_grant_skips_read_back() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/drive/v3/files/f1/permissions"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let link = ShareLinks::new(test_api(&server)).create("f1").await.unwrap();
        assert!(link.is_empty());
    }

    #[tokio::test]
    async fn test_failed_read_back_keeps_grant() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/drive/v3/files/f1/permissions"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1"))
            .and(query_param("fields", "webViewLink"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let link = ShareLinks::new(test_api(&server)).create("f1").await.unwrap();
        assert!(link.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_without_anyone_issues_no_delete() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "permissions": [{"id": "p1", "type": "user"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let revocation = ShareLinks::new(test_api(&server)).revoke("f1").await.unwrap();
        assert_eq!(revocation, Revocation::NothingToRevoke);
    }

    #[tokio::test]
    async fn test_revoke_deletes_first_anyone_only() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "permissions": [
                    {"id": "owner", "type": "user", "role": "owner"},
                    {"id": "p-first", "type": "anyone", "role": "reader"},
                    {"id": "p-second", "type": "anyone", "role": "reader"}
                ]
            })))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/drive/v3/files/f1/permissions/p-first"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/drive/v3/files/f1/permissions/p-second"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let revocation = ShareLinks::new(test_api(&server)).revoke("f1").await.unwrap();
        assert_eq!(
            revocation,
            Revocation::Deleted {
                permission_id: "p-first".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_revoke_delete_failure_is_reported_not_raised() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1/permissions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "permissions": [{"id": "p1", "type": "anyone"}]
            })))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/drive/v3/files/f1/permissions/p1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let revocation = ShareLinks::new(test_api(&server)).revoke("f1").await.unwrap();
        assert!(matches!(revocation, Revocation::DeleteFailed { .. }));
    }

    #[tokio::test]
    async fn test_revoke_empty_body_is_nothing_to_revoke() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("GET"))
            .and(path("/drive/v3/files/f1/permissions"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let revocation = ShareLinks::new(test_api(&server)).revoke("f1").await.unwrap();
        assert_eq!(revocation, Revocation::NothingToRevoke);
    }
}
