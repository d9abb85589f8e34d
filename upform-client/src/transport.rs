//! HTTP transport
//!
//! The upload paths only need two calls: a multipart post carrying one file
//! part, and a classic urlencoded form post. Anything that can make those
//! two calls can drive an upload.

use crate::error::ClientError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Longest response body quoted in an error message
const MAX_ERROR_BODY: usize = 512;

/// Status and body of a completed request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Only 200 counts as success
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Body of a 200 response, or an API error quoting the body
    pub fn into_ok(self) -> Result<Bytes, ClientError> {
        if self.is_ok() {
            return Ok(self.body);
        }
        let mut message = String::from_utf8_lossy(&self.body).into_owned();
        if message.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !message.is_char_boundary(cut) {
                cut -= 1;
            }
            message.truncate(cut);
        }
        warn!(status = self.status, "Request rejected");
        Err(ClientError::Api {
            status: self.status,
            message,
        })
    }
}

/// File part of a multipart upload
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field_name: String,
    pub file_name: String,
    pub data: Bytes,
}

impl FilePart {
    /// Part named `file` with the generic file name the form API accepts
    pub fn new(data: Bytes) -> Self {
        Self {
            field_name: "file".to_string(),
            file_name: "file.data".to_string(),
            data,
        }
    }
}

/// Request capability consumed by the upload paths
#[async_trait]
pub trait Transport: Send + Sync {
    /// Multipart post: the file part first, then the text fields in order
    async fn post_multipart(
        &self,
        url: &str,
        fields: Vec<(String, String)>,
        file: FilePart,
    ) -> Result<HttpResponse, ClientError>;

    /// `application/x-www-form-urlencoded` post of an already encoded body
    async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, ClientError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn post_multipart(
        &self,
        url: &str,
        fields: Vec<(String, String)>,
        file: FilePart,
    ) -> Result<HttpResponse, ClientError> {
        (**self).post_multipart(url, fields, file).await
    }

    async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, ClientError> {
        (**self).post_form(url, body).await
    }
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn finish(response: reqwest::Response) -> Result<HttpResponse, ClientError> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_multipart(
        &self,
        url: &str,
        fields: Vec<(String, String)>,
        file: FilePart,
    ) -> Result<HttpResponse, ClientError> {
        let size = file.data.len() as u64;
        let part = Part::stream_with_length(reqwest::Body::from(file.data), size)
            .file_name(file.file_name);
        let form = fields
            .into_iter()
            .fold(Form::new().part(file.field_name, part), |form, (name, value)| {
                form.text(name, value)
            });

        debug!(url = %url, size, "POST multipart");
        let response = self.client.post(url).multipart(form).send().await?;
        Self::finish(response).await
    }

    async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, ClientError> {
        debug!(url = %url, "POST form");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;
        Self::finish(response).await
    }
}
