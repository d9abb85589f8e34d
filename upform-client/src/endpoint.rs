//! Server routing
//!
//! The form API is served from a fixed set of hosts. `Auto` picks the best
//! line automatically, the carrier variants pin one network, and `Multi`
//! serves the sliced upload protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Routing hint naming one API host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    #[default]
    Auto,
    Telecom,
    Cnc,
    Ctt,
    Multi,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Auto,
        Route::Telecom,
        Route::Cnc,
        Route::Ctt,
        Route::Multi,
    ];

    pub fn host(self) -> &'static str {
        match self {
            Route::Auto => "v0.api.upyun.com",
            Route::Telecom => "v1.api.upyun.com",
            Route::Cnc => "v2.api.upyun.com",
            Route::Ctt => "v3.api.upyun.com",
            Route::Multi => "m0.api.upyun.com",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Route::Auto => "auto",
            Route::Telecom => "telecom",
            Route::Cnc => "cnc",
            Route::Ctt => "ctt",
            Route::Multi => "multi",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Route::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown route '{}', expected one of: auto, telecom, cnc, ctt, multi",
                    s
                )
            })
    }
}

/// Resolved base URL requests are sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn for_route(scheme: &str, route: Route) -> Self {
        Self {
            base: format!("{}://{}", scheme, route.host()),
        }
    }

    /// Explicit base URL, e.g. a private gateway
    pub fn custom(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Upload URL for a bucket: `{base}/{bucket}`
    pub fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/{}", self.base, bucket.trim_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_hosts() {
        assert_eq!(Route::Auto.host(), "v0.api.upyun.com");
        assert_eq!(Route::Multi.host(), "m0.api.upyun.com");
        assert_eq!(Route::default(), Route::Auto);
    }

    #[test]
    fn test_route_parse() {
        assert_eq!("CNC".parse::<Route>().unwrap(), Route::Cnc);
        assert_eq!("multi".parse::<Route>().unwrap(), Route::Multi);
        assert!("v9".parse::<Route>().is_err());
    }

    #[test]
    fn test_bucket_url() {
        let ep = Endpoint::for_route("http", Route::Multi);
        assert_eq!(ep.bucket_url("demo"), "http://m0.api.upyun.com/demo");

        let custom = Endpoint::custom("https://gw.internal:8443/");
        assert_eq!(custom.bucket_url("/demo/"), "https://gw.internal:8443/demo");
    }
}
