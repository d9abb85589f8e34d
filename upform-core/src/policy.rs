//! Canonical policies
//!
//! A policy is the parameter set of one request: single-shot upload, slice
//! session initiation, one block, or finalization. Fields keep their
//! insertion order for the structured (JSON) encoding and are sorted by key
//! for the canonical signing string. Both encodings are pure functions of the
//! field contents.

use crate::error::{Result, UpformError};
use crate::signer::SigMethod;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::fmt;

/// Field names understood by the form API
pub mod fields {
    pub const BUCKET: &str = "bucket";
    pub const SAVE_KEY: &str = "save-key";
    pub const EXPIRATION: &str = "expiration";

    pub const PATH: &str = "path";
    pub const FILE_BLOCKS: &str = "file_blocks";
    pub const FILE_HASH: &str = "file_hash";
    pub const FILE_SIZE: &str = "file_size";

    pub const SAVE_TOKEN: &str = "save_token";
    pub const BLOCK_INDEX: &str = "block_index";
    pub const BLOCK_HASH: &str = "block_hash";

    // Optional single-shot parameters
    pub const CONTENT_MD5: &str = "content-md5";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CONTENT_LENGTH_RANGE: &str = "content-length-range";
    pub const ALLOW_FILE_TYPE: &str = "allow-file-type";
    pub const NOTIFY_URL: &str = "notify-url";
    pub const RETURN_URL: &str = "return-url";
    pub const EXT_PARAM: &str = "ext-param";
}

/// Scalar value of a policy field
///
/// Non-negative integers are always held as `UInt` so that a value built in
/// code and the same value decoded from JSON compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyValue {
    Str(String),
    Int(i64),
    UInt(u64),
}

impl PolicyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PolicyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PolicyValue::Int(v) => Some(*v),
            PolicyValue::UInt(v) => i64::try_from(*v).ok(),
            PolicyValue::Str(_) => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PolicyValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            PolicyValue::Str(s) => serde_json::Value::String(s.clone()),
            PolicyValue::Int(v) => serde_json::Value::from(*v),
            PolicyValue::UInt(v) => serde_json::Value::from(*v),
        }
    }

    fn from_json(key: &str, value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(PolicyValue::Str(s.clone())),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Ok(PolicyValue::UInt(v))
                } else if let Some(v) = n.as_i64() {
                    Ok(PolicyValue::Int(v))
                } else {
                    Err(UpformError::InvalidPolicy(format!(
                        "field '{}' is not an integer: {}",
                        key, n
                    )))
                }
            }
            other => Err(UpformError::InvalidPolicy(format!(
                "field '{}' has unsupported value {}",
                key, other
            ))),
        }
    }
}

/// Decimal for integers, verbatim for strings. The server rebuilds the
/// canonical string with the same rules.
impl fmt::Display for PolicyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyValue::Str(s) => f.write_str(s),
            PolicyValue::Int(v) => write!(f, "{}", v),
            PolicyValue::UInt(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for PolicyValue {
    fn from(v: &str) -> Self {
        PolicyValue::Str(v.to_string())
    }
}

impl From<String> for PolicyValue {
    fn from(v: String) -> Self {
        PolicyValue::Str(v)
    }
}

impl From<&String> for PolicyValue {
    fn from(v: &String) -> Self {
        PolicyValue::Str(v.clone())
    }
}

impl From<i64> for PolicyValue {
    fn from(v: i64) -> Self {
        match u64::try_from(v) {
            Ok(u) => PolicyValue::UInt(u),
            Err(_) => PolicyValue::Int(v),
        }
    }
}

impl From<u64> for PolicyValue {
    fn from(v: u64) -> Self {
        PolicyValue::UInt(v)
    }
}

impl From<u32> for PolicyValue {
    fn from(v: u32) -> Self {
        PolicyValue::UInt(u64::from(v))
    }
}

/// Which request a policy authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Whole payload in one multipart post
    SingleShot,
    /// Opens a slice session
    Initiation,
    /// One block of a slice session
    Block,
    /// Closes a slice session
    Finalize,
}

impl PolicyKind {
    /// Signing variant the server expects for this request type
    pub fn sig_method(self) -> SigMethod {
        match self {
            PolicyKind::SingleShot => SigMethod::ForFile,
            PolicyKind::Initiation | PolicyKind::Block | PolicyKind::Finalize => {
                SigMethod::ForBlocks
            }
        }
    }

    /// Fields that must be present before the policy can be signed
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            PolicyKind::SingleShot => &[fields::BUCKET, fields::SAVE_KEY, fields::EXPIRATION],
            PolicyKind::Initiation => &[
                fields::PATH,
                fields::EXPIRATION,
                fields::FILE_BLOCKS,
                fields::FILE_HASH,
                fields::FILE_SIZE,
            ],
            PolicyKind::Block => &[
                fields::SAVE_TOKEN,
                fields::EXPIRATION,
                fields::BLOCK_INDEX,
                fields::BLOCK_HASH,
            ],
            PolicyKind::Finalize => &[fields::SAVE_TOKEN, fields::EXPIRATION],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::SingleShot => "single-shot",
            PolicyKind::Initiation => "initiation",
            PolicyKind::Block => "block",
            PolicyKind::Finalize => "finalize",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered field set of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    kind: PolicyKind,
    fields: Vec<(String, PolicyValue)>,
}

impl Policy {
    fn empty(kind: PolicyKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Policy for a single-shot upload of `save_key` into `bucket`
    pub fn single_shot(bucket: &str, save_key: &str, expiration: i64) -> Self {
        let mut p = Self::empty(PolicyKind::SingleShot);
        p.set(fields::BUCKET, bucket);
        p.set(fields::SAVE_KEY, save_key);
        p.set(fields::EXPIRATION, expiration);
        p
    }

    /// Policy opening a slice session for a whole payload
    pub fn initiation(
        path: &str,
        expiration: i64,
        file_blocks: u64,
        file_hash: &str,
        file_size: u64,
    ) -> Self {
        let mut p = Self::empty(PolicyKind::Initiation);
        p.set(fields::PATH, path);
        p.set(fields::EXPIRATION, expiration);
        p.set(fields::FILE_BLOCKS, file_blocks);
        p.set(fields::FILE_HASH, file_hash);
        p.set(fields::FILE_SIZE, file_size);
        p
    }

    /// Policy for block `block_index` of an open session
    pub fn block(save_token: &str, expiration: i64, block_index: u64, block_hash: &str) -> Self {
        let mut p = Self::empty(PolicyKind::Block);
        p.set(fields::SAVE_TOKEN, save_token);
        p.set(fields::EXPIRATION, expiration);
        p.set(fields::BLOCK_INDEX, block_index);
        p.set(fields::BLOCK_HASH, block_hash);
        p
    }

    /// Policy closing an open session
    pub fn finalize(save_token: &str, expiration: i64) -> Self {
        let mut p = Self::empty(PolicyKind::Finalize);
        p.set(fields::SAVE_TOKEN, save_token);
        p.set(fields::EXPIRATION, expiration);
        p
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Set a field. An existing key keeps its position and gets the new value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PolicyValue>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&PolicyValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PolicyValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check that every field required by the policy kind is present
    pub fn validate(&self) -> Result<()> {
        match self
            .kind
            .required_fields()
            .iter()
            .find(|name| !self.contains(name))
        {
            Some(missing) => Err(UpformError::InvalidPolicy(format!(
                "{} policy is missing '{}'",
                self.kind, missing
            ))),
            None => Ok(()),
        }
    }

    /// Compact JSON object in insertion order
    pub fn to_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map).to_string()
    }

    /// Base64 of [`Policy::to_json`], sent as the `policy` form field
    pub fn structured_encode(&self) -> String {
        STANDARD.encode(self.to_json())
    }

    /// `key || value` for every field in byte order of the keys, no separators
    pub fn canonical_string(&self) -> String {
        let mut sorted: Vec<&(String, PolicyValue)> = self.fields.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted.iter().fold(String::new(), |mut acc, (k, v)| {
            acc.push_str(k);
            acc.push_str(&v.to_string());
            acc
        })
    }

    /// `application/x-www-form-urlencoded` body of all fields in insertion order
    pub fn form_encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter().map(|(k, v)| (k.as_str(), v.to_string())))
            .finish()
    }

    /// Fields as stringified name/value pairs, insertion order
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }

    /// Parse a JSON object back into a policy of the given kind
    pub fn from_json(kind: PolicyKind, json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let object = value.as_object().ok_or_else(|| {
            UpformError::InvalidPolicy("policy JSON must be an object".to_string())
        })?;

        let mut p = Self::empty(kind);
        for (key, value) in object {
            p.fields.push((key.clone(), PolicyValue::from_json(key, value)?));
        }
        Ok(p)
    }

    /// Inverse of [`Policy::structured_encode`]
    pub fn from_encoded(kind: PolicyKind, encoded: &str) -> Result<Self> {
        let raw = STANDARD.decode(encoded)?;
        let json = String::from_utf8(raw)
            .map_err(|e| UpformError::Serialization(e.to_string()))?;
        Self::from_json(kind, &json)
    }
}
