//! Drive gateway: the single entry point callers depend on.

use oauth2::AccessToken;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{info, warn};

use drivegate_common::Result;

use crate::auth::{AccessTokenSource, RefreshTokenProvider};
use crate::client::ApiClient;
use crate::config::{Credentials, DriveConfig};
use crate::download::{DownloadProxy, DownloadReport, DownloadSink};
use crate::model::{
    FileListing, FolderCreation, FolderListing, RemoteObject, ShareLink, FOLDER_MIME_TYPE,
};
use crate::query::ListingQueries;
use crate::share::ShareLinks;
use crate::upload::ResumableUploader;

/// Façade over the remote Drive API.
///
/// Holds only immutable credentials and a connection pool, so every method
/// can be called concurrently through a shared reference. Each call fetches
/// its own token.
pub struct DriveGateway {
    api: Arc<ApiClient>,
    listings: ListingQueries,
    uploads: ResumableUploader,
    shares: ShareLinks,
    downloads: DownloadProxy,
}

impl DriveGateway {
    /// Create a gateway that refreshes its token from the configured endpoint.
    ///
    /// # Errors
    /// - Invalid configuration
    /// - HTTP client construction failure
    pub fn new(config: &DriveConfig) -> Result<Self> {
        config.validate()?;
        let credentials = Arc::new(config.credentials()?);
        let http = ApiClient::build_http()?;
        let tokens = Arc::new(RefreshTokenProvider::new(http.clone(), credentials.clone()));
        Ok(Self::from_parts(
            ApiClient::new(http, credentials, tokens),
            config.download_chunk_size,
        ))
    }

    /// Create a gateway with a custom token source.
    pub fn with_token_source(
        credentials: Credentials,
        tokens: Arc<dyn AccessTokenSource>,
        download_chunk_size: usize,
    ) -> Result<Self> {
        let http = ApiClient::build_http()?;
        Ok(Self::from_parts(
            ApiClient::new(http, Arc::new(credentials), tokens),
            download_chunk_size,
        ))
    }

    fn from_parts(api: ApiClient, download_chunk_size: usize) -> Self {
        let api = Arc::new(api);
        Self {
            listings: ListingQueries::new(api.clone()),
            uploads: ResumableUploader::new(api.clone()),
            shares: ShareLinks::new(api.clone()),
            downloads: DownloadProxy::new(api.clone(), download_chunk_size),
            api,
        }
    }

    /// Fetch a fresh bearer token. Empty if the token endpoint failed.
    pub async fn access_token(&self) -> AccessToken {
        self.api.access_token().await
    }

    /// Folders owned by the caller.
    pub async fn list_folders(&self) -> Result<FolderListing> {
        self.listings.list_folders().await
    }

    /// Non-folder objects owned by the caller.
    pub async fn list_files(&self) -> Result<FileListing> {
        self.listings.list_files().await
    }

    /// Non-folder objects owned by the caller inside `folder_id`.
    pub async fn list_files_by_folder(&self, folder_id: &str) -> Result<FileListing> {
        self.listings.list_files_by_folder(folder_id).await
    }

    /// Create a folder unless one with the same name already exists.
    ///
    /// # Errors
    /// - Network errors
    pub async fn create_folder(&self, name: &str) -> Result<FolderCreation> {
        let existing = self.list_folders().await?;
        if existing.contains_name(name) {
            info!(folder = name, "Folder already exists, not creating");
            return Ok(FolderCreation::Duplicate);
        }

        let token = self.api.access_token().await;
        let url = self.api.files_endpoint(&[])?;
        let request = self.api.http().post(url).json(&serde_json::json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        }));
        let response = self
            .api
            .send(self.api.authorize(request, &token), "create folder")
            .await?;

        let folder: RemoteObject = self.api.decode_or_default(response, "create folder").await?;
        if !folder.is_placeholder() {
            info!(id = %folder.id, name = %folder.name, "Folder created");
        }
        Ok(FolderCreation::Created(folder))
    }

    /// Delete an object. Returns the raw success flag of the call.
    ///
    /// # Errors
    /// - Network errors
    pub async fn delete_object(&self, object_id: &str) -> Result<bool> {
        let token = self.api.access_token().await;
        let url = self.api.files_endpoint(&[object_id])?;
        let request = self.api.http().delete(url);
        let response = self
            .api
            .send(self.api.authorize(request, &token), "delete object")
            .await?;

        let status = response.status();
        if status.is_success() {
            info!(object_id, "Object deleted");
        } else {
            warn!(object_id, %status, "Delete rejected");
        }
        Ok(status.is_success())
    }

    /// Upload `source` as `original_name` into `folder_id`.
    ///
    /// Returns the empty placeholder if either protocol phase failed.
    ///
    /// # Errors
    /// - Network errors
    /// - Reading `source` fails
    pub async fn create_file<R>(
        &self,
        source: R,
        original_name: &str,
        folder_id: &str,
    ) -> Result<RemoteObject>
    where
        R: AsyncRead + Unpin + Send,
    {
        let outcome = self.uploads.upload(source, original_name, folder_id).await?;
        Ok(outcome.into_object())
    }

    /// Make `object_id` readable by anyone with the link and return the link.
    ///
    /// Empty on failure.
    pub async fn create_share_link(&self, object_id: &str) -> Result<ShareLink> {
        self.shares.create(object_id).await
    }

    /// Remove the public permission from `object_id`.
    ///
    /// Reports `true` once the permission lookup completes, whether or not
    /// a permission was found or its deletion succeeded.
    pub async fn revoke_share_link(&self, object_id: &str) -> Result<bool> {
        self.shares.revoke(object_id).await?;
        Ok(true)
    }

    /// Proxy the object's bytes into `sink` in bounded chunks.
    pub async fn stream_download<S>(
        &self,
        object_id: &str,
        display_name: &str,
        sink: &mut S,
    ) -> Result<DownloadReport>
    where
        S: DownloadSink + ?Sized,
    {
        self.downloads.stream(object_id, display_name, sink).await
    }
}
