//! Shared test fixtures: a recording in-memory transport and payload helpers

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use upform_client::{ClientConfig, ClientError, FilePart, FormClient, HttpResponse, Transport};

pub const BUCKET: &str = "demo";
pub const ACCOUNT_KEY: &str = "account-key";
pub const SESSION_SECRET: &str = "session-secret";
pub const SESSION_TOKEN: &str = "9d1c0ab2e6";
pub const SESSION_EXPIRY: i64 = 1_900_000_000;

/// One request seen by the transport
#[derive(Debug, Clone)]
pub enum Recorded {
    Form {
        url: String,
        body: String,
    },
    Multipart {
        url: String,
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

impl Recorded {
    pub fn url(&self) -> &str {
        match self {
            Recorded::Form { url, .. } | Recorded::Multipart { url, .. } => url,
        }
    }

    pub fn is_form(&self) -> bool {
        matches!(self, Recorded::Form { .. })
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self, Recorded::Multipart { .. })
    }

    /// Text fields, decoding the urlencoded body of form posts
    pub fn fields(&self) -> Vec<(String, String)> {
        match self {
            Recorded::Form { body, .. } => url::form_urlencoded::parse(body.as_bytes())
                .into_owned()
                .collect(),
            Recorded::Multipart { fields, .. } => fields.clone(),
        }
    }

    pub fn field(&self, name: &str) -> Option<String> {
        self.fields()
            .into_iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
    }

    /// The `policy` field, base64-decoded
    pub fn policy_json_text(&self) -> String {
        let blob = self.field("policy").expect("request has no policy field");
        let raw = STANDARD.decode(blob).expect("policy is not base64");
        String::from_utf8(raw).expect("policy is not utf-8")
    }

    pub fn policy(&self) -> Value {
        serde_json::from_str(&self.policy_json_text()).expect("policy is not JSON")
    }

    /// Policy fields as strings, from either wire layout
    pub fn policy_fields(&self) -> HashMap<String, String> {
        if self.field("policy").is_some() {
            return as_string_map(&self.policy());
        }
        self.fields()
            .into_iter()
            .filter(|(k, _)| k != "signature")
            .collect()
    }

    pub fn is_initiation(&self) -> bool {
        self.is_form() && self.policy_fields().contains_key("path")
    }

    pub fn block_index(&self) -> Option<u64> {
        if !self.is_multipart() {
            return None;
        }
        self.policy_fields()
            .get("block_index")
            .and_then(|v| v.parse().ok())
    }

    pub fn file_data(&self) -> Option<&Bytes> {
        match self {
            Recorded::Multipart { file, .. } => Some(&file.data),
            Recorded::Form { .. } => None,
        }
    }
}

pub type Handler = Box<dyn Fn(&Recorded) -> Result<HttpResponse, ClientError> + Send + Sync>;

/// Transport that records every request and answers through a handler.
///
/// With a delay, block posts sleep before they are recorded, so a block
/// dropped mid-flight never shows up in the log.
pub struct RecordingTransport {
    requests: Mutex<Vec<Recorded>>,
    handler: Handler,
    delay: Option<Duration>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RecordingTransport {
    pub fn new(
        handler: impl Fn(&Recorded) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self::build(handler, None))
    }

    /// Like `new`, but every block post waits `delay` first
    pub fn delayed(
        delay: Duration,
        handler: impl Fn(&Recorded) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self::build(handler, Some(delay)))
    }

    fn build(
        handler: impl Fn(&Recorded) -> Result<HttpResponse, ClientError> + Send + Sync + 'static,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            handler: Box::new(handler),
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Most block posts seen in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Always answers 200 with an empty body
    pub fn accepting() -> Arc<Self> {
        Self::new(|_| Ok(HttpResponse::new(200, "")))
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn block_indices(&self) -> Vec<u64> {
        self.requests()
            .iter()
            .filter_map(Recorded::block_index)
            .collect()
    }

    pub fn form_count(&self) -> usize {
        self.requests().iter().filter(|r| r.is_form()).count()
    }

    fn record(&self, request: Recorded) -> Result<HttpResponse, ClientError> {
        let reply = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        reply
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_multipart(
        &self,
        url: &str,
        fields: Vec<(String, String)>,
        file: FilePart,
    ) -> Result<HttpResponse, ClientError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.record(Recorded::Multipart {
            url: url.to_string(),
            fields,
            file,
        })
    }

    async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, ClientError> {
        self.record(Recorded::Form {
            url: url.to_string(),
            body,
        })
    }
}

/// Session response body with the given markers
pub fn session_body(markers: &[u8]) -> String {
    json!({
        "save_token": SESSION_TOKEN,
        "bucket_name": BUCKET,
        "blocks": markers.len(),
        "status": markers,
        "expired_at": SESSION_EXPIRY,
        "token_secret": SESSION_SECRET,
    })
    .to_string()
}

/// Slice server: initiation returns a session with `markers`, everything
/// else is accepted
pub fn slice_server(markers: Vec<u8>) -> Arc<RecordingTransport> {
    RecordingTransport::new(move |req| {
        if req.is_initiation() {
            Ok(HttpResponse::new(200, session_body(&markers)))
        } else {
            Ok(HttpResponse::new(200, ""))
        }
    })
}

/// Handler for a slice server that rejects one block index with `status`
fn failing_block_handler(
    markers: Vec<u8>,
    bad_index: u64,
    status: u16,
) -> impl Fn(&Recorded) -> Result<HttpResponse, ClientError> + Send + Sync + 'static {
    move |req| {
        if req.is_initiation() {
            Ok(HttpResponse::new(200, session_body(&markers)))
        } else if req.block_index() == Some(bad_index) {
            Ok(HttpResponse::new(status, "block rejected"))
        } else {
            Ok(HttpResponse::new(200, ""))
        }
    }
}

/// Slice server that rejects one block index with `status`
pub fn slice_server_failing_block(markers: Vec<u8>, bad_index: u64, status: u16) -> Arc<RecordingTransport> {
    RecordingTransport::new(failing_block_handler(markers, bad_index, status))
}

/// Slow slice server: block posts take `delay`, one index is rejected
pub fn slow_slice_server_failing_block(
    delay: Duration,
    markers: Vec<u8>,
    bad_index: u64,
    status: u16,
) -> Arc<RecordingTransport> {
    RecordingTransport::delayed(delay, failing_block_handler(markers, bad_index, status))
}

/// Slow slice server that accepts every block
pub fn slow_slice_server(delay: Duration, markers: Vec<u8>) -> Arc<RecordingTransport> {
    RecordingTransport::delayed(delay, move |req| {
        if req.is_initiation() {
            Ok(HttpResponse::new(200, session_body(&markers)))
        } else {
            Ok(HttpResponse::new(200, ""))
        }
    })
}

/// Config with small blocks so payloads stay tiny
pub fn small_block_config(block_size: u64) -> ClientConfig {
    ClientConfig {
        block_size,
        ..Default::default()
    }
}

pub fn client(
    transport: &Arc<RecordingTransport>,
    config: ClientConfig,
) -> FormClient<Arc<RecordingTransport>> {
    FormClient::with_transport(transport.clone(), BUCKET, ACCOUNT_KEY, config)
        .expect("valid client")
}

/// Deterministic payload
pub fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Decoded JSON object as string map, for comparing policy fields
pub fn as_string_map(value: &Value) -> HashMap<String, String> {
    value
        .as_object()
        .expect("policy is an object")
        .iter()
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
