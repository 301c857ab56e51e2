//! Wire types exchanged with the Drive REST API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME type the provider uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Permission type granting access to anyone holding the link.
pub const ANYONE_PERMISSION: &str = "anyone";

/// A file or folder on the remote store.
///
/// Identity is `id`; names are not unique. The default value is the empty
/// placeholder returned when a create call fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    /// Provider-assigned ID.
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub mime_type: String,
    /// Size in bytes as the provider reports it (string-encoded, files only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,
}

impl RemoteObject {
    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Whether this is the empty placeholder rather than a real object.
    pub fn is_placeholder(&self) -> bool {
        self.id.is_empty()
    }

    /// Get size as u64.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_ref().and_then(|s| s.parse().ok())
    }
}

/// One response page of a files query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub incomplete_search: bool,
    #[serde(default)]
    pub files: Vec<RemoteObject>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether an object with exactly this name is present.
    pub fn contains_name(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name == name)
    }
}

/// Listing of folders owned by the caller.
pub type FolderListing = Listing;

/// Listing of non-folder objects owned by the caller.
pub type FileListing = Listing;

/// A permission record attached to a remote object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub permission_type: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub allow_file_discovery: bool,
}

impl Permission {
    pub fn is_anyone(&self) -> bool {
        self.permission_type == ANYONE_PERMISSION
    }
}

/// Full permission set of an object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionList {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<Permission>>,
}

impl PermissionList {
    /// First permission of type "anyone", if any.
    pub fn first_anyone(&self) -> Option<&Permission> {
        self.permissions
            .as_deref()
            .and_then(|perms| perms.iter().find(|p| p.is_anyone()))
    }
}

/// Body of a permission grant.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionGrant<'a> {
    pub role: &'a str,
    #[serde(rename = "type")]
    pub permission_type: &'a str,
}

impl PermissionGrant<'static> {
    /// Read access for anyone with the link.
    pub const ANYONE_READER: Self = Self {
        role: "reader",
        permission_type: ANYONE_PERMISSION,
    };
}

/// Public view URL of a shared object. Empty when sharing failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
}

impl ShareLink {
    pub fn is_empty(&self) -> bool {
        self.web_view_link.as_deref().map_or(true, str::is_empty)
    }
}

/// Result of a folder creation request.
#[derive(Debug, Clone, PartialEq)]
pub enum FolderCreation {
    /// The create call was issued; the object is the placeholder if the
    /// response could not be decoded.
    Created(RemoteObject),
    /// A folder with this name already exists; nothing was created.
    Duplicate,
}
