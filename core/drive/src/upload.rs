//! Two-phase resumable upload: open a session, then send the bytes.

use chrono::Utc;
use oauth2::AccessToken;
use reqwest::header;
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use drivegate_common::Result;

use crate::client::{decode_body, ApiClient, Decoded};
use crate::model::RemoteObject;

/// Length of the random prefix added to uploaded file names.
const NAME_TOKEN_LEN: usize = 8;

/// Session URL returned by the initiate call.
///
/// Valid for exactly one transfer; [`ResumableUploader::transfer`] consumes it.
#[derive(Debug)]
pub struct UploadSession {
    url: String,
}

/// Protocol phase an upload failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Initiate,
    Transfer,
}

/// Why an upload did not produce an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    /// Initiate call returned a non-success status.
    InitiateRejected { status: u16 },
    /// Initiate succeeded but gave no usable `Location` header.
    MissingSessionUrl,
    /// Transfer call returned a non-success status.
    TransferRejected { status: u16 },
    /// Transfer response could not be decoded into an object.
    MalformedResponse(String),
}

impl UploadFailure {
    pub fn phase(&self) -> UploadPhase {
        match self {
            UploadFailure::InitiateRejected { .. } | UploadFailure::MissingSessionUrl => {
                UploadPhase::Initiate
            }
            UploadFailure::TransferRejected { .. } | UploadFailure::MalformedResponse(_) => {
                UploadPhase::Transfer
            }
        }
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadFailure::InitiateRejected { status } => {
                write!(f, "upload session rejected with status {}", status)
            }
            UploadFailure::MissingSessionUrl => write!(f, "no session URL in Location header"),
            UploadFailure::TransferRejected { status } => {
                write!(f, "byte transfer rejected with status {}", status)
            }
            UploadFailure::MalformedResponse(reason) => {
                write!(f, "transfer response unusable: {}", reason)
            }
        }
    }
}

/// Terminal state of an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Transferred(RemoteObject),
    Aborted(UploadFailure),
}

impl UploadOutcome {
    /// The created object, or the empty placeholder.
    pub fn into_object(self) -> RemoteObject {
        match self {
            UploadOutcome::Transferred(object) => object,
            UploadOutcome::Aborted(_) => RemoteObject::default(),
        }
    }
}

/// Prefix `original` with a short random token: `<token>_<original>`.
///
/// Avoids a pre-check round trip; collisions remain possible.
pub fn upload_file_name(original: &str) -> String {
    let token: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(NAME_TOKEN_LEN)
        .collect();
    format!("{}_{}", token, original)
}

/// Drives the resumable upload protocol.
pub struct ResumableUploader {
    api: Arc<ApiClient>,
}

impl ResumableUploader {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Upload everything `source` yields into `folder_id`.
    ///
    /// The transfer only runs if the initiate call produced a session URL.
    /// The whole source is buffered before the transfer.
    ///
    /// # Errors
    /// - Network errors on either call
    /// - Reading `source` fails
    pub async fn upload<R>(
        &self,
        source: R,
        original_name: &str,
        folder_id: &str,
    ) -> Result<UploadOutcome>
    where
        R: AsyncRead + Unpin + Send,
    {
        let name = upload_file_name(original_name);
        let token = self.api.access_token().await;

        let session = match self.initiate(&token, &name, folder_id).await? {
            Ok(session) => session,
            Err(failure) => {
                warn!(file = %name, %failure, "Upload aborted before transfer");
                return Ok(UploadOutcome::Aborted(failure));
            }
        };

        let data = match read_all(source).await {
            Ok(data) => data,
            Err(e) => {
                warn!(file = %name, "Upload source unreadable, session left unused");
                return Err(e);
            }
        };

        self.transfer(&token, session, data).await
    }

    /// Phase 1: open a session and read its URL from `Location`.
    ///
    /// The outer error is transport failure; the inner one is a rejected
    /// or incomplete initiate response.
    pub async fn initiate(
        &self,
        token: &AccessToken,
        name: &str,
        folder_id: &str,
    ) -> Result<std::result::Result<UploadSession, UploadFailure>> {
        let mut url = self.api.endpoint(&["upload", "drive", "v3", "files"])?;
        url.query_pairs_mut().append_pair("uploadType", "resumable");

        let metadata = serde_json::json!({
            "name": name,
            "description": format!("{} {}", Utc::now().timestamp_micros(), folder_id),
            "parents": [folder_id],
        });

        let request = self
            .api
            .http()
            .post(url)
            .header(header::CONTENT_TYPE, "application/json; charset=UTF-8")
            .body(metadata.to_string());

        let response = self
            .api
            .send(self.api.authorize(request, token), "start resumable upload")
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Err(UploadFailure::InitiateRejected {
                status: status.as_u16(),
            }));
        }

        let session_url = response
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        match session_url {
            Some(url) => {
                debug!(file = %name, "Upload session opened");
                Ok(Ok(UploadSession { url }))
            }
            None => Ok(Err(UploadFailure::MissingSessionUrl)),
        }
    }

    /// Phase 2: PUT the bytes to the session URL in one request.
    ///
    /// A failure here leaves the session orphaned at the provider.
    pub async fn transfer(
        &self,
        token: &AccessToken,
        session: UploadSession,
        data: Vec<u8>,
    ) -> Result<UploadOutcome> {
        let size = data.len();
        let request = self
            .api
            .http()
            .put(session.url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(data);

        let response = self
            .api
            .send(self.api.authorize(request, token), "upload bytes")
            .await?;

        let status = response.status();
        if !status.is_success() {
            let failure = UploadFailure::TransferRejected {
                status: status.as_u16(),
            };
            warn!(%failure, "Upload session orphaned");
            return Ok(UploadOutcome::Aborted(failure));
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let failure = UploadFailure::MalformedResponse(format!("body read failed: {}", e));
                warn!(%failure, "Upload finished without a usable object");
                return Ok(UploadOutcome::Aborted(failure));
            }
        };
        match decode_body::<RemoteObject>(status, &body) {
            Decoded::Value(object) => {
                info!(id = %object.id, name = %object.name, size, "Upload complete");
                Ok(UploadOutcome::Transferred(object))
            }
            Decoded::Empty(reason) => {
                let failure = UploadFailure::MalformedResponse(reason);
                warn!(%failure, "Upload finished without a usable object");
                Ok(UploadOutcome::Aborted(failure))
            }
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(mut source: R) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    source.read_to_end(&mut data).await?;
    Ok(data)
}
