//! Upload Commands
//!
//! `put` sends a file in one request; `slice` sends it block by block and
//! can be re-run after a failure to resume.

use crate::symbols;
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use upform_client::{BlockEvent, ClientConfig, FileSource, FormClient, FormOptions};

/// Where and how to upload
pub struct Target {
    pub bucket: String,
    pub key: String,
    pub config: ClientConfig,
}

impl Target {
    fn client(&self) -> Result<FormClient> {
        FormClient::new(&self.bucket, &self.key, self.config.clone())
            .context("Failed to create upload client")
    }
}

/// Single-shot upload configuration
pub struct PutConfig {
    pub file: PathBuf,
    pub remote: String,
    pub content_md5: bool,
    pub content_type: Option<String>,
}

/// Run the single-shot upload
pub async fn put(target: &Target, config: PutConfig) -> Result<()> {
    let client = target.client()?;
    let source = FileSource::open(&config.file)
        .await
        .with_context(|| format!("Failed to open {}", config.file.display()))?;

    let options = FormOptions {
        auto_content_md5: config.content_md5,
        content_type: config.content_type,
        ..Default::default()
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Uploading {}", display_name(&config.file)));
    pb.enable_steady_tick(Duration::from_millis(100));

    let result = client
        .post_data_with(&source, &config.remote, &options)
        .await;
    pb.finish_and_clear();
    let report = result.context("Upload failed")?;

    println!(
        "{} {}{}\n  Size: {}\n  MD5:  {}",
        style("Successfully uploaded:").green().bold(),
        target.bucket,
        config.remote,
        format_bytes(report.bytes_sent),
        report.digest
    );

    Ok(())
}

/// Run the sliced upload
pub async fn slice(target: &Target, file: &Path, remote: &str) -> Result<()> {
    let size = tokio::fs::metadata(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?
        .len();

    let pb = ProgressBar::new(size);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")?
            .progress_chars("#>-"),
    );

    let bar = pb.clone();
    let client = target.client()?.with_progress(move |event| match event {
        BlockEvent::Skipped { size, .. } | BlockEvent::Uploaded { size, .. } => bar.inc(size),
    });

    match client.slice_post_file(file, remote).await {
        Ok(report) => {
            pb.finish_and_clear();
            println!(
                "{} {}{}",
                style("Successfully uploaded:").green().bold(),
                target.bucket,
                remote
            );
            println!("  Size:   {}", format_bytes(report.file_size));
            println!("  MD5:    {}", report.file_hash);
            println!(
                "  Blocks: {} total, {} sent",
                report.blocks_total,
                style(report.blocks_uploaded).green()
            );
            if report.blocks_skipped > 0 {
                println!(
                    "  {} {} blocks already on the server",
                    style(symbols::SKIP).cyan(),
                    report.blocks_skipped
                );
            }
            println!("  {} transferred", format_bytes(report.bytes_sent));
            Ok(())
        }
        Err(e) => {
            pb.abandon();
            if let Some(index) = e.block_index() {
                eprintln!(
                    "{} Block {} failed. Re-run the same command to resume.",
                    style(symbols::CROSS).red(),
                    index
                );
            }
            Err(anyhow::Error::new(e).context("Sliced upload failed"))
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string()
}

/// Format bytes as human-readable string
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 bytes");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024 / 2), "2.50 MB");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/tmp/a/b.bin")), "b.bin");
        assert_eq!(display_name(Path::new("/")), "file");
    }
}
