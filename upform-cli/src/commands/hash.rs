//! Hash Command
//!
//! Prints the digest the sliced path would send as `file_hash`.

use anyhow::{Context, Result};
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    let digest = upform_core::digest_file(path)
        .with_context(|| format!("Failed to hash {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
