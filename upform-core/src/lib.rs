//! upform Core Library
//!
//! Building blocks shared by every request of the form upload protocol.
//! This crate provides:
//! - MD5 content digests for whole files and individual blocks
//! - Canonical policies with their structured, canonical and form encodings
//! - The two signing variants (sorted fields for slices, policy blob for files)
//! - Session status decoding and block arithmetic for sliced uploads
//! - Common error handling

pub mod block;
pub mod error;
pub mod hash;
pub mod policy;
pub mod session;
pub mod signer;

pub use block::{block_count, block_range};
pub use error::{Result, UpformError};
pub use hash::{digest, digest_file, ContentDigest, DigestBuilder};
pub use policy::{Policy, PolicyKind, PolicyValue};
pub use session::{BlockMarker, SessionStatus};
pub use signer::{KeySignature, SigMethod, Signature, SignedPolicy, WireFormat};

/// Default slice size used by the sliced upload protocol (1 MiB)
pub const DEFAULT_BLOCK_SIZE: u64 = 1024 * 1024;

/// Default lifetime of a signed policy, in seconds
pub const DEFAULT_EXPIRATION_SECS: i64 = 5 * 60;

/// Longest policy lifetime accepted, in seconds (one day)
pub const MAX_EXPIRATION_SECS: i64 = 24 * 60 * 60;

/// Unix timestamp `window_secs` seconds from now, as used by `expiration`
pub fn expiration_after(window_secs: i64) -> Result<i64> {
    chrono::Utc::now()
        .timestamp()
        .checked_add(window_secs)
        .ok_or_else(|| {
            UpformError::Configuration(format!(
                "expiration window of {} seconds is out of range",
                window_secs
            ))
        })
}
