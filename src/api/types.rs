//! Request and response bodies of the Nick Cloud HTTP API.

use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};

/// Body of `POST /send_code`. Also the payload kept as pending registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeRequest {
    pub vm_name: String,
    pub vm_email: String,
    pub vm_password: String,
    /// Requested capacity, e.g. "500MB"
    pub vm_storage: String,
}

/// Body of `POST /register_vm`: the pending payload plus the code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVmRequest {
    #[serde(flatten)]
    pub registration: SendCodeRequest,
    pub entered_code: String,
}

/// Body of `POST /login`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub vm_name: String,
    pub password: String,
}

/// Common `{success, message, ...}` wrapper around every JSON answer.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    /// Turn `success: false` into `CloudError::Api`.
    pub fn into_reply(self, fallback: &str) -> Result<Reply<T>> {
        if !self.success {
            return Err(CloudError::api(self.message, fallback));
        }
        Ok(Reply {
            message: self.message,
            data: self.body,
        })
    }
}

/// A successful answer: optional server message plus the endpoint payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub message: Option<String>,
    pub data: T,
}

/// Payload types for endpoints without extra fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CodeSent {
    /// Echoed confirmation code when the server could not send the email
    #[serde(default)]
    pub test_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Registered {
    #[serde(default)]
    pub vm_name: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoginInfo {
    #[serde(default)]
    pub vm_name: Option<String>,
    /// Display-formatted capacity, e.g. "500MB"
    #[serde(default)]
    pub storage: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StorageBody {
    #[serde(default)]
    pub storage: Option<crate::fs::StorageInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ListingBody {
    #[serde(default)]
    pub files: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Uploaded {
    /// Name the server stored the file under (may differ on collision)
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub size_display: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Deleted {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size_freed: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Cleaned {
    #[serde(default)]
    pub deleted_count: u64,
}

/// `GET /api/status`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServiceStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    #[serde(default)]
    pub storage_path: Option<String>,
}

impl ServiceStatus {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}
