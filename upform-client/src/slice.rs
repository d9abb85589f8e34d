//! Sliced upload orchestrator
//!
//! State machine: Init -> SessionNegotiated -> BlockLoop -> Finalizing -> Done,
//! with Failed reachable from every state.
//!
//! - Negotiation hashes the whole payload, signs an initiation policy with
//!   the account key and decodes the session status.
//! - The block loop uploads every block whose marker is not done, in
//!   ascending index order, each signed with the session secret.
//! - Finalization closes the session with a fresh expiration.
//!
//! All three phases target the same endpoint, resolved once per call. Any
//! error ends the upload; resuming means calling it again, which skips the
//! blocks the server already reports as done.

use crate::error::{ClientError, UploadError};
use crate::form::FormClient;
use crate::source::{read_exact_at, ByteSource};
use crate::transport::{FilePart, Transport};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::fmt;
use tracing::{debug, info, warn};
use upform_core::hash::DigestBuilder;
use upform_core::{
    block_count, block_range, digest, expiration_after, KeySignature, Policy, SessionStatus,
};

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceState {
    Init,
    SessionNegotiated,
    BlockLoop,
    Finalizing,
    Done,
    Failed,
}

impl fmt::Display for SliceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SliceState::Init => "init",
            SliceState::SessionNegotiated => "session-negotiated",
            SliceState::BlockLoop => "block-loop",
            SliceState::Finalizing => "finalizing",
            SliceState::Done => "done",
            SliceState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Progress of one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockEvent {
    /// Already complete on the server
    Skipped { index: u64, size: u64 },
    /// Sent and acknowledged
    Uploaded { index: u64, size: u64 },
}

/// Outcome of a completed sliced upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceReport {
    pub save_token: String,
    pub file_hash: String,
    pub file_size: u64,
    pub blocks_total: u64,
    pub blocks_uploaded: u64,
    pub blocks_skipped: u64,
    pub bytes_sent: u64,
}

/// Negotiated session plus what the block loop needs from negotiation
struct Session {
    status: SessionStatus,
    signer: KeySignature,
    file_hash: String,
    file_size: u64,
    blocks: u64,
}

/// One sliced upload call
pub(crate) struct SliceUpload<'a, T: Transport> {
    client: &'a FormClient<T>,
    source: &'a dyn ByteSource,
    remote_path: &'a str,
    url: String,
    state: SliceState,
}

impl<'a, T: Transport> SliceUpload<'a, T> {
    pub(crate) fn new(
        client: &'a FormClient<T>,
        source: &'a dyn ByteSource,
        remote_path: &'a str,
    ) -> Self {
        let url = client.config.slice_endpoint().bucket_url(&client.bucket);
        Self {
            client,
            source,
            remote_path,
            url,
            state: SliceState::Init,
        }
    }

    fn enter(&mut self, next: SliceState) {
        debug!(from = %self.state, to = %next, "Slice upload state change");
        self.state = next;
    }

    pub(crate) async fn run(mut self) -> Result<SliceReport, UploadError> {
        match self.drive().await {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(phase = e.phase(), error = %e, "Sliced upload failed");
                self.enter(SliceState::Failed);
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<SliceReport, UploadError> {
        let session = self.negotiate().await?;
        self.enter(SliceState::SessionNegotiated);
        info!(
            token = %session.status.save_token,
            blocks = session.blocks,
            done = session.status.completed_blocks(),
            "Slice session negotiated"
        );

        self.enter(SliceState::BlockLoop);
        let (blocks_uploaded, bytes_sent) = self.upload_blocks(&session).await?;

        self.enter(SliceState::Finalizing);
        self.finalize(&session).await?;

        self.enter(SliceState::Done);
        info!(
            uploaded = blocks_uploaded,
            bytes = bytes_sent,
            "Sliced upload complete"
        );
        Ok(SliceReport {
            save_token: session.status.save_token.clone(),
            file_hash: session.file_hash,
            file_size: session.file_size,
            blocks_total: session.blocks,
            blocks_uploaded,
            blocks_skipped: session.blocks - blocks_uploaded,
            bytes_sent,
        })
    }

    /// Whole-payload digest, read block by block
    async fn payload_digest(&self, total: u64) -> Result<String, ClientError> {
        let block_size = self.client.config.block_size;
        let mut builder = DigestBuilder::new();
        for index in 0..block_count(total, block_size) {
            let range = block_range(index, block_size, total);
            let data = read_exact_at(self.source, range.start, range.end - range.start).await?;
            builder.update(&data);
        }
        Ok(builder.finish().to_hex())
    }

    async fn negotiate(&self) -> Result<Session, UploadError> {
        let config = &self.client.config;
        let file_size = self.source.len();
        let blocks = block_count(file_size, config.block_size);

        let file_hash = self
            .payload_digest(file_size)
            .await
            .map_err(UploadError::Negotiate)?;

        let expiration = expiration_after(config.expiration_secs)
            .map_err(|e| UploadError::Negotiate(e.into()))?;
        let policy = Policy::initiation(
            self.remote_path,
            expiration,
            blocks,
            &file_hash,
            file_size,
        );
        let signed = self
            .client
            .signer
            .sign(policy)
            .map_err(|e| UploadError::Negotiate(e.into()))?;

        debug!(url = %self.url, blocks, file_size, "Negotiating slice session");
        let body = self
            .client
            .transport
            .post_form(&self.url, signed.form_body(config.wire))
            .await
            .and_then(|response| response.into_ok())
            .map_err(UploadError::Negotiate)?;

        let status = SessionStatus::from_json(&body).map_err(|e| UploadError::Negotiate(e.into()))?;
        status
            .check_blocks(blocks)
            .map_err(|e| UploadError::Negotiate(e.into()))?;
        let signer = status
            .signer()
            .map_err(|e| UploadError::Negotiate(e.into()))?;

        Ok(Session {
            status,
            signer,
            file_hash,
            file_size,
            blocks,
        })
    }

    /// Upload every pending block; returns (blocks uploaded, bytes sent)
    async fn upload_blocks(&self, session: &Session) -> Result<(u64, u64), UploadError> {
        let block_size = self.client.config.block_size;
        let mut pending = Vec::new();
        for index in 0..session.blocks {
            let done = session.status.marker(index).is_some_and(|m| m.is_done());
            if done {
                let range = block_range(index, block_size, session.file_size);
                debug!(block = index, "Block already complete, skipping");
                self.emit(BlockEvent::Skipped {
                    index,
                    size: range.end - range.start,
                });
            } else {
                pending.push(index);
            }
        }

        // Blocks are pulled lazily in index order; a failed block ends the
        // fold and drops any block still in flight.
        stream::iter(pending)
            .map(|index| self.upload_block(session, index))
            .buffer_unordered(self.client.config.concurrency)
            .try_fold((0u64, 0u64), |(count, bytes), size| async move {
                Ok::<_, UploadError>((count + 1, bytes + size))
            })
            .await
    }

    async fn upload_block(&self, session: &Session, index: u64) -> Result<u64, UploadError> {
        let fail = |source: ClientError| UploadError::Block { index, source };

        let range = block_range(index, self.client.config.block_size, session.file_size);
        let size = range.end - range.start;
        let data = read_exact_at(self.source, range.start, size)
            .await
            .map_err(fail)?;
        let block_hash = digest(&data);

        let policy = Policy::block(
            &session.status.save_token,
            session.status.expired_at,
            index,
            &block_hash,
        );
        let signed = session
            .signer
            .sign(policy)
            .map_err(|e| fail(e.into()))?;

        debug!(block = index, size, "Uploading block");
        self.client
            .transport
            .post_multipart(
                &self.url,
                signed.form_fields(self.client.config.wire),
                FilePart::new(data),
            )
            .await
            .and_then(|response| response.into_ok())
            .map_err(fail)?;

        self.emit(BlockEvent::Uploaded { index, size });
        Ok(size)
    }

    async fn finalize(&self, session: &Session) -> Result<(), UploadError> {
        let expiration = expiration_after(self.client.config.expiration_secs)
            .map_err(|e| UploadError::Finalize(e.into()))?;
        let policy = Policy::finalize(&session.status.save_token, expiration);
        let signed = session
            .signer
            .sign(policy)
            .map_err(|e| UploadError::Finalize(e.into()))?;

        debug!(url = %self.url, "Finalizing slice session");
        self.client
            .transport
            .post_form(&self.url, signed.form_body(self.client.config.wire))
            .await
            .and_then(|response| response.into_ok())
            .map_err(UploadError::Finalize)?;
        Ok(())
    }

    fn emit(&self, event: BlockEvent) {
        if let Some(progress) = &self.client.progress {
            progress(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(SliceState::Init.to_string(), "init");
        assert_eq!(SliceState::BlockLoop.to_string(), "block-loop");
        assert_eq!(SliceState::Failed.to_string(), "failed");
    }
}
