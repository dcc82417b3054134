//! Nick Cloud API client with request/response handling.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::api::types::{
    Cleaned, CodeSent, Deleted, Empty, Envelope, ListingBody, LoginInfo, LoginRequest,
    RegisterVmRequest, Registered, Reply, SendCodeRequest, ServiceStatus, StorageBody, Uploaded,
};
use crate::config::ClientConfig;
use crate::error::{CloudError, Result};
use crate::fs::StorageInfo;
use crate::http::{parse_body, HttpClient};

/// Operations the session controller needs from the remote service.
///
/// `ApiClient` is the HTTP implementation. Every method returns
/// `CloudError::Api` when the server answers `success: false`, and one of
/// the transport variants when no server message is available.
#[async_trait]
pub trait CloudApi: Send + Sync {
    /// `GET /api/status`
    async fn status(&self) -> Result<ServiceStatus>;

    /// `POST /send_code`
    async fn send_code(&self, request: &SendCodeRequest) -> Result<Reply<CodeSent>>;

    /// `POST /register_vm`
    async fn register_vm(&self, request: &RegisterVmRequest) -> Result<Reply<Registered>>;

    /// `POST /login`
    async fn login(&self, request: &LoginRequest) -> Result<Reply<LoginInfo>>;

    /// `GET /api/vm/{name}/storage`
    async fn storage(&self, vm_name: &str) -> Result<StorageInfo>;

    /// `GET /api/vm/{name}/files`, entries left unvalidated.
    async fn files(&self, vm_name: &str) -> Result<Vec<Value>>;

    /// `POST /api/vm/{name}/upload` as multipart field `file`.
    async fn upload(&self, vm_name: &str, filename: &str, data: Vec<u8>)
        -> Result<Reply<Uploaded>>;

    /// `GET /api/vm/{name}/download/{filename}`
    async fn download(&self, vm_name: &str, filename: &str) -> Result<Vec<u8>>;

    /// `DELETE /api/vm/{name}/delete/{filename}`
    async fn delete(&self, vm_name: &str, filename: &str) -> Result<Reply<Deleted>>;

    /// `POST /api/vm/{name}/cleanup`
    async fn cleanup(&self, vm_name: &str) -> Result<Reply<Cleaned>>;
}

#[async_trait]
impl<T: CloudApi + ?Sized> CloudApi for Arc<T> {
    async fn status(&self) -> Result<ServiceStatus> {
        (**self).status().await
    }

    async fn send_code(&self, request: &SendCodeRequest) -> Result<Reply<CodeSent>> {
        (**self).send_code(request).await
    }

    async fn register_vm(&self, request: &RegisterVmRequest) -> Result<Reply<Registered>> {
        (**self).register_vm(request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<Reply<LoginInfo>> {
        (**self).login(request).await
    }

    async fn storage(&self, vm_name: &str) -> Result<StorageInfo> {
        (**self).storage(vm_name).await
    }

    async fn files(&self, vm_name: &str) -> Result<Vec<Value>> {
        (**self).files(vm_name).await
    }

    async fn upload(
        &self,
        vm_name: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Reply<Uploaded>> {
        (**self).upload(vm_name, filename, data).await
    }

    async fn download(&self, vm_name: &str, filename: &str) -> Result<Vec<u8>> {
        (**self).download(vm_name, filename).await
    }

    async fn delete(&self, vm_name: &str, filename: &str) -> Result<Reply<Deleted>> {
        (**self).delete(vm_name, filename).await
    }

    async fn cleanup(&self, vm_name: &str) -> Result<Reply<Cleaned>> {
        (**self).cleanup(vm_name).await
    }
}

/// HTTP client for the Nick Cloud API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    base: Url,
}

impl ApiClient {
    /// Create a client from a configuration (base URL, proxy, timeout).
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::from_config(config)?,
            base: config.parsed_base_url()?,
        })
    }

    /// Create a client for a base URL with default settings.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        Self::new(&ClientConfig::default().with_base_url(base_url))
    }

    /// Base URL requests are built from.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append percent-encoded path segments to the base URL.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| CloudError::Custom(format!("Invalid base URL: {}", self.base)))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    fn vm_endpoint(&self, vm_name: &str, tail: &[&str]) -> Result<Url> {
        let mut segments = vec!["api", "vm", vm_name];
        segments.extend_from_slice(tail);
        self.endpoint(&segments)
    }
}

#[async_trait]
impl CloudApi for ApiClient {
    async fn status(&self) -> Result<ServiceStatus> {
        self.http.get_json(self.endpoint(&["api", "status"])?).await
    }

    async fn send_code(&self, request: &SendCodeRequest) -> Result<Reply<CodeSent>> {
        debug!(vm = %request.vm_name, "requesting confirmation code");
        let env: Envelope<CodeSent> = self
            .http
            .post_json(self.endpoint(&["send_code"])?, request)
            .await?;
        env.into_reply("Could not send the confirmation code")
    }

    async fn register_vm(&self, request: &RegisterVmRequest) -> Result<Reply<Registered>> {
        debug!(vm = %request.registration.vm_name, "registering volume");
        let env: Envelope<Registered> = self
            .http
            .post_json(self.endpoint(&["register_vm"])?, request)
            .await?;
        env.into_reply("Registration failed")
    }

    async fn login(&self, request: &LoginRequest) -> Result<Reply<LoginInfo>> {
        debug!(vm = %request.vm_name, "logging in");
        let env: Envelope<LoginInfo> = self
            .http
            .post_json(self.endpoint(&["login"])?, request)
            .await?;
        env.into_reply("Login failed")
    }

    async fn storage(&self, vm_name: &str) -> Result<StorageInfo> {
        let env: Envelope<StorageBody> = self
            .http
            .get_json(self.vm_endpoint(vm_name, &["storage"])?)
            .await?;
        env.into_reply("Could not read storage usage")?
            .data
            .storage
            .ok_or(CloudError::InvalidResponse)
    }

    async fn files(&self, vm_name: &str) -> Result<Vec<Value>> {
        let env: Envelope<ListingBody> = self
            .http
            .get_json(self.vm_endpoint(vm_name, &["files"])?)
            .await?;
        Ok(env.into_reply("Could not list files")?.data.files)
    }

    async fn upload(
        &self,
        vm_name: &str,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<Reply<Uploaded>> {
        debug!(vm = %vm_name, file = %filename, bytes = data.len(), "uploading");
        let form = Form::new().part("file", Part::bytes(data).file_name(filename.to_string()));
        let env: Envelope<Uploaded> = self
            .http
            .post_multipart(self.vm_endpoint(vm_name, &["upload"])?, form)
            .await?;
        env.into_reply("Upload failed")
    }

    async fn download(&self, vm_name: &str, filename: &str) -> Result<Vec<u8>> {
        let raw = self
            .http
            .get_raw(self.vm_endpoint(vm_name, &["download", filename])?)
            .await?;
        if raw.is_success() {
            return Ok(raw.body);
        }
        let text = String::from_utf8_lossy(&raw.body);
        let status = reqwest::StatusCode::from_u16(raw.status)
            .map_err(|_| CloudError::Http(raw.status))?;
        let env: Envelope<Empty> = parse_body(status, &text)?;
        match env.into_reply("Download failed") {
            Err(e) => Err(e),
            Ok(_) => Err(CloudError::Http(raw.status)),
        }
    }

    async fn delete(&self, vm_name: &str, filename: &str) -> Result<Reply<Deleted>> {
        let env: Envelope<Deleted> = self
            .http
            .delete_json(self.vm_endpoint(vm_name, &["delete", filename])?)
            .await?;
        env.into_reply("Delete failed")
    }

    async fn cleanup(&self, vm_name: &str) -> Result<Reply<Cleaned>> {
        let env: Envelope<Cleaned> = self
            .http
            .post_empty(self.vm_endpoint(vm_name, &["cleanup"])?)
            .await?;
        env.into_reply("Cleanup failed")
    }
}
