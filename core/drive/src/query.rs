//! Listing queries against the files endpoint.

use std::sync::Arc;
use tracing::debug;

use drivegate_common::Result;

use crate::client::ApiClient;
use crate::model::{FileListing, FolderListing, Listing, FOLDER_MIME_TYPE};

/// Field subset requested for every listing.
pub const LISTING_FIELDS: &str = "files(id, name, size, mimeType, createdTime)";

/// Which partition of the caller's objects to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingQuery {
    /// Folders owned by the caller.
    Folders,
    /// Non-folder objects owned by the caller.
    Files,
    /// Non-folder objects owned by the caller inside one folder.
    FilesInFolder(String),
}

impl ListingQuery {
    /// Render the provider's `q` filter expression.
    pub fn filter(&self) -> String {
        match self {
            ListingQuery::Folders => {
                format!("mimeType='{}' and 'me' in owners", FOLDER_MIME_TYPE)
            }
            ListingQuery::Files => {
                format!("mimeType!='{}' and 'me' in owners", FOLDER_MIME_TYPE)
            }
            ListingQuery::FilesInFolder(folder_id) => format!(
                "'{}' in parents and mimeType!='{}' and 'me' in owners",
                escape_literal(folder_id),
                FOLDER_MIME_TYPE
            ),
        }
    }

    fn operation(&self) -> &'static str {
        match self {
            ListingQuery::Folders => "list folders",
            ListingQuery::Files => "list files",
            ListingQuery::FilesInFolder(_) => "list files by folder",
        }
    }
}

/// Escape a value for use inside a single-quoted query literal.
fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Runs listing queries. One request per call, no pagination.
pub struct ListingQueries {
    api: Arc<ApiClient>,
}

impl ListingQueries {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Run a query. Bad statuses and bodies yield an empty listing.
    ///
    /// # Errors
    /// - Network errors
    pub async fn run(&self, query: &ListingQuery) -> Result<Listing> {
        let operation = query.operation();
        let url = self.api.files_endpoint(&[])?;
        let token = self.api.access_token().await;
        let filter = query.filter();

        let request = self
            .api
            .http()
            .get(url)
            .query(&[("q", filter.as_str()), ("fields", LISTING_FIELDS)]);

        let response = self
            .api
            .send(self.api.authorize(request, &token), operation)
            .await?;

        let listing: Listing = self.api.decode_or_default(response, operation).await?;
        debug!(operation, count = listing.files.len(), "Listing complete");
        Ok(listing)
    }

    pub async fn list_folders(&self) -> Result<FolderListing> {
        self.run(&ListingQuery::Folders).await
    }

    pub async fn list_files(&self) -> Result<FileListing> {
        self.run(&ListingQuery::Files).await
    }

    pub async fn list_files_by_folder(&self, folder_id: &str) -> Result<FileListing> {
        self.run(&ListingQuery::FilesInFolder(folder_id.to_string()))
            .await
    }
}
