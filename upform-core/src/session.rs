//! Slice session status
//!
//! Decoded from the server's answer to a session initiation. The status
//! array carries one marker per block in block-index order.

use crate::error::{Result, UpformError};
use crate::signer::KeySignature;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-block completion marker (0 = pending, 1 = in progress, 2 = done)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMarker", into = "u8")]
pub enum BlockMarker {
    Pending,
    InProgress,
    Done,
}

impl BlockMarker {
    pub fn is_done(self) -> bool {
        self == BlockMarker::Done
    }
}

/// Older service revisions report booleans instead of the tri-state integers
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMarker {
    Int(i64),
    Bool(bool),
}

impl TryFrom<RawMarker> for BlockMarker {
    type Error = String;

    fn try_from(raw: RawMarker) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawMarker::Int(0) => Ok(BlockMarker::Pending),
            RawMarker::Int(1) => Ok(BlockMarker::InProgress),
            RawMarker::Int(2) => Ok(BlockMarker::Done),
            RawMarker::Int(other) => Err(format!("unknown block marker {}", other)),
            RawMarker::Bool(true) => Ok(BlockMarker::Done),
            RawMarker::Bool(false) => Ok(BlockMarker::Pending),
        }
    }
}

impl From<BlockMarker> for u8 {
    fn from(marker: BlockMarker) -> Self {
        match marker {
            BlockMarker::Pending => 0,
            BlockMarker::InProgress => 1,
            BlockMarker::Done => 2,
        }
    }
}

/// Server-side state of an in-progress sliced upload
#[derive(Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Opaque session token, required on every later request
    pub save_token: String,
    pub bucket_name: String,
    /// Number of blocks the server expects
    pub blocks: u64,
    /// One marker per block, index order
    pub status: Vec<BlockMarker>,
    /// Unix seconds after which the server drops the session
    pub expired_at: i64,
    /// Session-scoped signing secret
    pub token_secret: String,
}

impl SessionStatus {
    /// Decode a session response body
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let status: SessionStatus = serde_json::from_slice(body)
            .map_err(|e| UpformError::MalformedSession(e.to_string()))?;
        if status.save_token.is_empty() {
            return Err(UpformError::MalformedSession(
                "empty save_token".to_string(),
            ));
        }
        Ok(status)
    }

    /// Check that the session describes `expected` blocks
    pub fn check_blocks(&self, expected: u64) -> Result<()> {
        if self.blocks != expected {
            return Err(UpformError::BlockCountMismatch {
                reported: self.blocks,
                expected,
            });
        }
        if self.status.len() as u64 != expected {
            return Err(UpformError::MalformedSession(format!(
                "status has {} markers for {} blocks",
                self.status.len(),
                expected
            )));
        }
        Ok(())
    }

    pub fn marker(&self, index: u64) -> Option<BlockMarker> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.status.get(i).copied())
    }

    /// Indices of blocks not yet confirmed done, ascending
    pub fn pending_blocks(&self) -> Vec<u64> {
        self.status
            .iter()
            .enumerate()
            .filter(|(_, m)| !m.is_done())
            .map(|(i, _)| i as u64)
            .collect()
    }

    pub fn completed_blocks(&self) -> usize {
        self.status.iter().filter(|m| m.is_done()).count()
    }

    /// Signer for block and finalize requests of this session
    pub fn signer(&self) -> Result<KeySignature> {
        KeySignature::new(self.token_secret.clone()).map_err(|_| {
            UpformError::MalformedSession("empty token_secret".to_string())
        })
    }
}

impl fmt::Debug for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStatus")
            .field("save_token", &self.save_token)
            .field("bucket_name", &self.bucket_name)
            .field("blocks", &self.blocks)
            .field("status", &self.status)
            .field("expired_at", &self.expired_at)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "save_token": "9d1c0ab2",
        "bucket_name": "demo",
        "blocks": 3,
        "status": [2, 0, 1],
        "expired_at": 1700000300,
        "token_secret": "s3cr3t"
    }"#;

    #[test]
    fn test_decode_sample() {
        let status = SessionStatus::from_json(SAMPLE.as_bytes()).unwrap();
        assert_eq!(status.save_token, "9d1c0ab2");
        assert_eq!(status.blocks, 3);
        assert_eq!(
            status.status,
            vec![BlockMarker::Done, BlockMarker::Pending, BlockMarker::InProgress]
        );
        assert_eq!(status.pending_blocks(), vec![1, 2]);
        assert_eq!(status.completed_blocks(), 1);
        assert_eq!(status.marker(0), Some(BlockMarker::Done));
        assert_eq!(status.marker(3), None);
        assert!(status.check_blocks(3).is_ok());
    }

    #[test]
    fn test_boolean_markers() {
        let body = r#"{"save_token":"t","bucket_name":"b","blocks":2,"status":[true,false],"expired_at":1,"token_secret":"s"}"#;
        let status = SessionStatus::from_json(body.as_bytes()).unwrap();
        assert_eq!(status.status, vec![BlockMarker::Done, BlockMarker::Pending]);
    }

    #[test]
    fn test_unknown_marker_rejected() {
        let body = r#"{"save_token":"t","bucket_name":"b","blocks":1,"status":[7],"expired_at":1,"token_secret":"s"}"#;
        let err = SessionStatus::from_json(body.as_bytes()).unwrap_err();
        assert!(matches!(err, UpformError::MalformedSession(_)));
    }

    #[test]
    fn test_missing_field_rejected() {
        let body = r#"{"save_token":"t","blocks":1,"status":[0]}"#;
        assert!(matches!(
            SessionStatus::from_json(body.as_bytes()),
            Err(UpformError::MalformedSession(_))
        ));
        assert!(SessionStatus::from_json(b"<html>busy</html>").is_err());
    }

    #[test]
    fn test_check_blocks_mismatch() {
        let status = SessionStatus::from_json(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(
            status.check_blocks(4),
            Err(UpformError::BlockCountMismatch { reported: 3, expected: 4 })
        ));

        let mut short = status.clone();
        short.status.pop();
        assert!(matches!(
            short.check_blocks(3),
            Err(UpformError::MalformedSession(_))
        ));
    }

    #[test]
    fn test_empty_secret_is_malformed() {
        let mut status = SessionStatus::from_json(SAMPLE.as_bytes()).unwrap();
        assert!(status.signer().is_ok());
        status.token_secret.clear();
        assert!(matches!(status.signer(), Err(UpformError::MalformedSession(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let status = SessionStatus::from_json(SAMPLE.as_bytes()).unwrap();
        assert!(!format!("{:?}", status).contains("s3cr3t"));
    }
}
