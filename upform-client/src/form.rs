//! Form upload client
//!
//! `FormClient` owns the transport, the bucket, the account key and the
//! upload configuration. It exposes the single-shot path directly and hands
//! sliced uploads to the orchestrator in [`crate::slice`].

use crate::config::ClientConfig;
use crate::error::{ClientError, UploadError};
use crate::slice::{BlockEvent, SliceReport, SliceUpload};
use crate::source::{read_exact_at, ByteSource, FileSource};
use crate::transport::{FilePart, HttpTransport, Transport};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use upform_core::policy::fields;
use upform_core::{expiration_after, ContentDigest, KeySignature, Policy, UpformError, WireFormat};

/// Callback receiving one event per skipped or uploaded block
pub type ProgressFn = Arc<dyn Fn(BlockEvent) + Send + Sync>;

/// Optional single-shot policy parameters
#[derive(Debug, Clone, Default)]
pub struct FormOptions {
    /// Explicit `content-md5`
    pub content_md5: Option<String>,
    /// Fill `content-md5` from the payload digest when not set explicitly
    pub auto_content_md5: bool,
    pub content_type: Option<String>,
    /// Accepted payload size range in bytes, `min,max`
    pub content_length_range: Option<(u64, u64)>,
    /// Allowed file extensions, e.g. `jpg,png`
    pub allow_file_type: Option<String>,
    pub notify_url: Option<String>,
    pub return_url: Option<String>,
    pub ext_param: Option<String>,
}

impl FormOptions {
    fn apply(&self, policy: &mut Policy, payload_digest: &str) {
        match (&self.content_md5, self.auto_content_md5) {
            (Some(md5), _) => policy.set(fields::CONTENT_MD5, md5),
            (None, true) => policy.set(fields::CONTENT_MD5, payload_digest),
            (None, false) => {}
        }
        if let Some(v) = &self.content_type {
            policy.set(fields::CONTENT_TYPE, v);
        }
        if let Some((min, max)) = self.content_length_range {
            policy.set(fields::CONTENT_LENGTH_RANGE, format!("{},{}", min, max));
        }
        if let Some(v) = &self.allow_file_type {
            policy.set(fields::ALLOW_FILE_TYPE, v);
        }
        if let Some(v) = &self.notify_url {
            policy.set(fields::NOTIFY_URL, v);
        }
        if let Some(v) = &self.return_url {
            policy.set(fields::RETURN_URL, v);
        }
        if let Some(v) = &self.ext_param {
            policy.set(fields::EXT_PARAM, v);
        }
    }
}

/// Result of a single-shot upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReport {
    pub bytes_sent: u64,
    pub digest: String,
}

/// Upload client for one bucket
pub struct FormClient<T: Transport = HttpTransport> {
    pub(crate) transport: T,
    pub(crate) bucket: String,
    pub(crate) signer: KeySignature,
    pub(crate) config: ClientConfig,
    pub(crate) progress: Option<ProgressFn>,
}

impl FormClient<HttpTransport> {
    /// Client over HTTP with the configured request timeout
    pub fn new(bucket: &str, key: &str, config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(config.timeout())?;
        Self::with_transport(transport, bucket, key, config)
    }
}

impl<T: Transport> FormClient<T> {
    /// Client over any transport
    pub fn with_transport(
        transport: T,
        bucket: &str,
        key: &str,
        config: ClientConfig,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        if bucket.trim_matches('/').is_empty() {
            return Err(UpformError::Configuration("bucket must not be empty".to_string()).into());
        }
        let signer = KeySignature::new(key)?;
        Ok(Self {
            transport,
            bucket: bucket.to_string(),
            signer,
            config,
            progress: None,
        })
    }

    /// Report block events to `f`
    pub fn with_progress(mut self, f: impl Fn(BlockEvent) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload a payload in one multipart request
    pub async fn post_data(
        &self,
        source: &dyn ByteSource,
        remote_path: &str,
    ) -> Result<PostReport, UploadError> {
        self.post_data_with(source, remote_path, &FormOptions::default())
            .await
    }

    /// Single-shot upload with optional policy parameters
    #[instrument(skip(self, source, options), fields(bucket = %self.bucket, size = source.len()))]
    pub async fn post_data_with(
        &self,
        source: &dyn ByteSource,
        remote_path: &str,
        options: &FormOptions,
    ) -> Result<PostReport, UploadError> {
        let size = source.len();
        let data = read_exact_at(source, 0, size)
            .await
            .map_err(UploadError::Post)?;
        let digest = ContentDigest::compute(&data).to_hex();

        let expiration =
            expiration_after(self.config.expiration_secs).map_err(|e| UploadError::Post(e.into()))?;
        let mut policy = Policy::single_shot(&self.bucket, remote_path, expiration);
        options.apply(&mut policy, &digest);
        let signed = self
            .signer
            .sign(policy)
            .map_err(|e| UploadError::Post(e.into()))?;

        // The single-shot endpoint only understands the policy blob layout
        let fields = signed.form_fields(WireFormat::PolicyBlob);
        let url = self.config.form_endpoint().bucket_url(&self.bucket);
        debug!(url = %url, "Posting payload");

        self.transport
            .post_multipart(&url, fields, FilePart::new(data))
            .await
            .and_then(|response| response.into_ok())
            .map_err(UploadError::Post)?;

        info!(bytes = size, "Upload complete");
        Ok(PostReport {
            bytes_sent: size,
            digest,
        })
    }

    /// Single-shot upload of a local file
    pub async fn post_file(
        &self,
        path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<PostReport, UploadError> {
        let source = FileSource::open(path)
            .await
            .map_err(|e| UploadError::Post(e.into()))?;
        self.post_data(&source, remote_path).await
    }

    /// Resumable sliced upload of a payload
    #[instrument(skip(self, source), fields(bucket = %self.bucket, size = source.len()))]
    pub async fn slice_post_data(
        &self,
        source: &dyn ByteSource,
        remote_path: &str,
    ) -> Result<SliceReport, UploadError> {
        SliceUpload::new(self, source, remote_path).run().await
    }

    /// Sliced upload of a local file
    pub async fn slice_post_file(
        &self,
        path: impl AsRef<Path>,
        remote_path: &str,
    ) -> Result<SliceReport, UploadError> {
        let source = FileSource::open(path)
            .await
            .map_err(|e| UploadError::Negotiate(e.into()))?;
        self.slice_post_data(&source, remote_path).await
    }
}
