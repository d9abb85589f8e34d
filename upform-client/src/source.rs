//! Byte sources
//!
//! A byte source is a finite payload of known length that supports
//! positional reads. The sliced path reads it twice: once for the
//! whole-file digest and once per block, so the content must stay stable
//! for the duration of one upload call.

use crate::error::ClientError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use upform_core::UpformError;

/// Positional-read capability consumed by the upload paths
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Total length in bytes
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read up to `count` bytes starting at `offset`. Returns fewer bytes
    /// only at end of source.
    async fn read_at(&self, offset: u64, count: usize) -> io::Result<Bytes>;
}

/// Read exactly `count` bytes at `offset`, failing with a short-read
/// integrity error otherwise
pub async fn read_exact_at(
    source: &dyn ByteSource,
    offset: u64,
    count: u64,
) -> Result<Bytes, ClientError> {
    let wanted = usize::try_from(count).map_err(|_| {
        UpformError::Configuration(format!("read of {} bytes exceeds address space", count))
    })?;
    let data = source.read_at(offset, wanted).await?;
    if data.len() != wanted {
        return Err(UpformError::ShortRead {
            offset,
            expected: count,
            actual: data.len() as u64,
        }
        .into());
    }
    Ok(data)
}

/// Payload already in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read_at(&self, offset: u64, count: usize) -> io::Result<Bytes> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let end = start.saturating_add(count).min(self.data.len());
        Ok(self.data.slice(start..end))
    }
}

/// Local file read with seek + read under a lock.
///
/// The length is captured at open time; a file that shrinks afterwards
/// surfaces as a short read.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok(Self {
            path,
            file: Mutex::new(file),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read_at(&self, offset: u64, count: usize) -> io::Result<Bytes> {
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = BytesMut::zeroed(count);
        let mut filled = 0;
        while filled < count {
            let n = file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf.freeze())
    }
}
