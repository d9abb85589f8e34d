//! Request signing
//!
//! Two signature variants exist and the server checks each against a
//! different request type:
//! - ForBlocks: `md5(canonical_string + secret)`, used for slice initiation,
//!   blocks and finalize
//! - ForFile: `md5(structured_encode + "&" + secret)`, used for single-shot
//!   uploads

use crate::error::{Result, UpformError};
use crate::hash::digest;
use crate::policy::Policy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signature variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigMethod {
    ForBlocks,
    ForFile,
}

/// Hex signature bound to one policy and one secret
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature(String);

impl Signature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secret-key signer.
///
/// The same type serves the account key and the per-session token secret.
#[derive(Clone)]
pub struct KeySignature {
    key: String,
}

impl KeySignature {
    /// Create a signer. Empty keys are rejected.
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(UpformError::EmptySecret);
        }
        Ok(Self { key })
    }

    pub fn sign_blocks(&self, policy: &Policy) -> Signature {
        let mut input = policy.canonical_string();
        input.push_str(&self.key);
        Signature(digest(input.as_bytes()))
    }

    pub fn sign_file(&self, policy: &Policy) -> Signature {
        let input = format!("{}&{}", policy.structured_encode(), self.key);
        Signature(digest(input.as_bytes()))
    }

    pub fn sign_with(&self, method: SigMethod, policy: &Policy) -> Signature {
        match method {
            SigMethod::ForBlocks => self.sign_blocks(policy),
            SigMethod::ForFile => self.sign_file(policy),
        }
    }

    /// Validate the policy and sign it with the variant its kind requires
    pub fn sign(&self, policy: Policy) -> Result<SignedPolicy> {
        policy.validate()?;
        let signature = self.sign_with(policy.kind().sig_method(), &policy);
        Ok(SignedPolicy { policy, signature })
    }
}

impl fmt::Debug for KeySignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySignature")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// How a signed policy is laid out in the request form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// `policy` (base64 JSON blob) and `signature`
    #[default]
    #[serde(rename = "policy")]
    PolicyBlob,
    /// Every policy field as its own form field, plus `signature`
    Fields,
}

/// A policy together with its signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPolicy {
    policy: Policy,
    signature: Signature,
}

impl SignedPolicy {
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Form fields to transmit, in order
    pub fn form_fields(&self, wire: WireFormat) -> Vec<(String, String)> {
        let mut out = match wire {
            WireFormat::PolicyBlob => vec![("policy".to_string(), self.policy.structured_encode())],
            WireFormat::Fields => self.policy.form_fields(),
        };
        out.push(("signature".to_string(), self.signature.to_string()));
        out
    }

    /// URL-encoded body for a classic form post
    pub fn form_body(&self, wire: WireFormat) -> String {
        let mut body = match wire {
            WireFormat::PolicyBlob => url::form_urlencoded::Serializer::new(String::new())
                .append_pair("policy", &self.policy.structured_encode())
                .finish(),
            WireFormat::Fields => self.policy.form_encode(),
        };
        if !body.is_empty() {
            body.push('&');
        }
        let signature = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("signature", self.signature.as_str())
            .finish();
        body.push_str(&signature);
        body
    }
}
