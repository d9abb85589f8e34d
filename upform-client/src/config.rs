//! Client configuration
//!
//! Embedded as the `[upload]` table of the CLI config file; every field has
//! a default so partial tables parse.

use crate::endpoint::{Endpoint, Route};
use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use upform_core::{
    UpformError, WireFormat, DEFAULT_BLOCK_SIZE, DEFAULT_EXPIRATION_SECS, MAX_EXPIRATION_SECS,
};
use url::Url;

/// Upload behaviour shared by the single-shot and sliced paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Slice size in bytes
    #[serde(default = "default_block_size")]
    pub block_size: u64,

    /// Policy lifetime in seconds
    #[serde(default = "default_expiration_secs")]
    pub expiration_secs: i64,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Blocks uploaded in parallel; 1 keeps strict index order
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Host for single-shot uploads
    #[serde(default)]
    pub form_route: Route,

    /// Host for every request of a sliced upload
    #[serde(default = "default_slice_route")]
    pub slice_route: Route,

    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Base URL overriding both routes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Layout of signed slice requests
    #[serde(default)]
    pub wire: WireFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            expiration_secs: default_expiration_secs(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            form_route: Route::default(),
            slice_route: default_slice_route(),
            scheme: default_scheme(),
            endpoint: None,
            wire: WireFormat::default(),
        }
    }
}

fn default_block_size() -> u64 {
    DEFAULT_BLOCK_SIZE
}

fn default_expiration_secs() -> i64 {
    DEFAULT_EXPIRATION_SECS
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_concurrency() -> usize {
    1
}

fn default_slice_route() -> Route {
    Route::Multi
}

fn default_scheme() -> String {
    "http".to_string()
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.block_size == 0 {
            return Err(invalid("block_size must be greater than zero"));
        }
        if self.concurrency == 0 {
            return Err(invalid("concurrency must be at least 1"));
        }
        if self.expiration_secs <= 0 || self.expiration_secs > MAX_EXPIRATION_SECS {
            return Err(UpformError::Configuration(format!(
                "expiration_secs must be between 1 and {}",
                MAX_EXPIRATION_SECS
            ))
            .into());
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs must be greater than zero"));
        }
        if self.scheme != "http" && self.scheme != "https" {
            return Err(invalid("scheme must be http or https"));
        }
        if let Some(endpoint) = &self.endpoint {
            check_endpoint(endpoint)?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn endpoint_for(&self, route: Route) -> Endpoint {
        match &self.endpoint {
            Some(base) => Endpoint::custom(base),
            None => Endpoint::for_route(&self.scheme, route),
        }
    }

    pub fn form_endpoint(&self) -> Endpoint {
        self.endpoint_for(self.form_route)
    }

    pub fn slice_endpoint(&self) -> Endpoint {
        self.endpoint_for(self.slice_route)
    }
}

/// The override must be an absolute http(s) URL with a host
fn check_endpoint(endpoint: &str) -> Result<(), ClientError> {
    let url = Url::parse(endpoint).map_err(|e| {
        UpformError::Configuration(format!("endpoint '{}' is not a URL: {}", endpoint, e))
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(UpformError::Configuration(format!(
            "endpoint '{}' must be an http or https URL with a host",
            endpoint
        ))
        .into());
    }
    Ok(())
}

fn invalid(msg: &str) -> ClientError {
    UpformError::Configuration(msg.to_string()).into()
}
