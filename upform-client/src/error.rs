//! Client errors
//!
//! `ClientError` describes what went wrong with one request or one read;
//! `UploadError` adds which phase of an upload it happened in.

use thiserror::Error;
use upform_core::UpformError;

/// Error category, independent of the phase it occurred in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, DNS or timeout failure below HTTP
    Transport,
    /// Non-OK status or an undecodable response
    Protocol,
    /// The byte source returned fewer bytes than announced
    Integrity,
    /// Bad input or configuration, nothing was sent
    Validation,
    /// Reading the byte source failed
    Io,
}

/// Request-level errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] UpformError),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Http(_) | ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Api { .. } => ErrorKind::Protocol,
            ClientError::Io(_) => ErrorKind::Io,
            ClientError::Core(core) => match core {
                UpformError::EmptySecret
                | UpformError::InvalidPolicy(_)
                | UpformError::Configuration(_) => ErrorKind::Validation,
                UpformError::ShortRead { .. } => ErrorKind::Integrity,
                UpformError::MalformedSession(_)
                | UpformError::BlockCountMismatch { .. }
                | UpformError::Serialization(_) => ErrorKind::Protocol,
                UpformError::Io(_) => ErrorKind::Io,
            },
        }
    }

    /// HTTP status of a rejected request, if that is what failed
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Upload errors, tagged with the failing phase
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("invalid upload request: {0}")]
    Prepare(#[source] ClientError),

    #[error("single-shot upload failed: {0}")]
    Post(#[source] ClientError),

    #[error("session negotiation failed: {0}")]
    Negotiate(#[source] ClientError),

    #[error("block {index} upload failed: {source}")]
    Block {
        index: u64,
        #[source]
        source: ClientError,
    },

    #[error("session finalize failed: {0}")]
    Finalize(#[source] ClientError),
}

impl UploadError {
    pub fn phase(&self) -> &'static str {
        match self {
            UploadError::Prepare(_) => "prepare",
            UploadError::Post(_) => "post",
            UploadError::Negotiate(_) => "negotiate",
            UploadError::Block { .. } => "block",
            UploadError::Finalize(_) => "finalize",
        }
    }

    /// Index of the failed block, for block-phase errors
    pub fn block_index(&self) -> Option<u64> {
        match self {
            UploadError::Block { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn client_error(&self) -> &ClientError {
        match self {
            UploadError::Prepare(e)
            | UploadError::Post(e)
            | UploadError::Negotiate(e)
            | UploadError::Finalize(e) => e,
            UploadError::Block { source, .. } => source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.client_error().kind()
    }
}
