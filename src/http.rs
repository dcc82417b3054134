//! HTTP client wrapper for Nick Cloud API requests.

use reqwest::multipart::Form;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{CloudError, Result};

/// Raw response for endpoints that may answer with a byte stream.
#[derive(Debug)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for making requests to the storage server.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client honoring the proxy and timeout of a configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.request_timeout);
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| CloudError::Custom(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| CloudError::Custom(format!("Failed to build client: {}", e)))?;
        Ok(Self { client })
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        decode(response).await
    }

    /// POST a JSON body and decode the JSON answer.
    pub async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%url, "POST json");
        let response = self.client.post(url).json(body).send().await?;
        decode(response).await
    }

    /// POST without a body.
    pub async fn post_empty<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "POST");
        let response = self.client.post(url).send().await?;
        decode(response).await
    }

    /// POST a multipart form.
    pub async fn post_multipart<T: DeserializeOwned>(&self, url: Url, form: Form) -> Result<T> {
        debug!(%url, "POST multipart");
        let response = self.client.post(url).multipart(form).send().await?;
        decode(response).await
    }

    /// DELETE and decode the JSON answer.
    pub async fn delete_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "DELETE");
        let response = self.client.delete(url).send().await?;
        decode(response).await
    }

    /// GET the raw body whatever the status.
    pub async fn get_raw(&self, url: Url) -> Result<RawResponse> {
        debug!(%url, "GET raw");
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        debug!(status, bytes = body.len(), "raw response");
        Ok(RawResponse { status, body })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let text = response.text().await?;
    debug!(status = status.as_u16(), bytes = text.len(), "response");
    parse_body(status, &text)
}

/// Error envelopes come with 4xx/5xx statuses, so the body is parsed first
/// and the status only matters when the body is not JSON.
pub(crate) fn parse_body<T: DeserializeOwned>(status: StatusCode, text: &str) -> Result<T> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(CloudError::Http(status.as_u16())),
        Err(e) => Err(CloudError::Json(e)),
    }
}
