//! Gateway to a Drive-style remote object store.
//!
//! This crate exposes remote files and folders through a small set of
//! operations on [`DriveGateway`]:
//! - Listings of folders and files owned by the caller
//! - Folder creation and object deletion
//! - Two-phase resumable upload
//! - Public share link grant and revocation
//! - Chunked download proxying with bounded memory
//!
//! # Failure contract
//! Remote rejections and unusable response bodies collapse to empty
//! values (empty listings, placeholder objects, empty links) and are
//! logged through `tracing`. Transport failures surface as errors.

pub mod auth;
pub mod client;
pub mod config;
pub mod download;
pub mod gateway;
pub mod model;
pub mod query;
pub mod share;
pub mod upload;

#[cfg(test)]
mod testing;

pub use auth::{AccessTokenSource, RefreshTokenProvider, StaticToken};
pub use config::{Credentials, DriveConfig, DEFAULT_DOWNLOAD_CHUNK_SIZE};
pub use download::{DownloadHeaders, DownloadReport, DownloadSink, WriterSink};
pub use gateway::DriveGateway;
pub use model::{
    FileListing, FolderCreation, FolderListing, Listing, Permission, RemoteObject, ShareLink,
};
pub use oauth2::AccessToken;
pub use upload::{UploadFailure, UploadOutcome, UploadPhase};
