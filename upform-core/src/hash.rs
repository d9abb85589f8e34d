//! Content digests
//!
//! Every integrity value on the wire (whole-file hash, block hash, request
//! signature) is the lowercase hex MD5 of some byte string. MD5 is an
//! integrity check here, not a security boundary.

use crate::error::Result;
use std::fmt;
use std::io::Read;

/// Read buffer used by [`ContentDigest::compute_reader`]
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// 128-bit MD5 digest of some content
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
    /// Compute the digest of data already in memory
    pub fn compute(data: &[u8]) -> Self {
        Self(md5::compute(data).0)
    }

    /// Compute the digest of everything a reader yields
    pub fn compute_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut ctx = md5::Context::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            ctx.consume(&buf[..n]);
        }
        Ok(Self(ctx.compute().0))
    }

    /// Get the raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// 32-char lowercase hex form
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Incremental digest over data arriving in pieces.
///
/// Feeding the pieces of a buffer in order yields the same value as
/// [`ContentDigest::compute`] over the whole buffer.
pub struct DigestBuilder(md5::Context);

impl DigestBuilder {
    pub fn new() -> Self {
        Self(md5::Context::new())
    }

    pub fn update(&mut self, data: &[u8]) {
        self.0.consume(data);
    }

    pub fn finish(self) -> ContentDigest {
        ContentDigest(self.0.compute().0)
    }
}

impl Default for DigestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Hex digest of a byte string
pub fn digest(data: &[u8]) -> String {
    ContentDigest::compute(data).to_hex()
}

/// Hex digest of a local file, read in a streaming fashion
pub fn digest_file(path: impl AsRef<std::path::Path>) -> Result<String> {
    let file = std::fs::File::open(path)?;
    Ok(ContentDigest::compute_reader(std::io::BufReader::new(file))?.to_hex())
}
