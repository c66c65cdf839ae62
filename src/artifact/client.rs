// src/artifact/client.rs

//! HTTP client for downloading plugin and asset archives

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default timeout for HTTP requests (5 minutes; plugin archives can be large)
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Thin wrapper around a blocking reqwest client
pub struct ArtifactClient {
    client: Client,
}

impl ArtifactClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("kiln/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::DownloadError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Download `url` to `dest_path`
    ///
    /// The body is streamed to a sibling temporary file which is renamed over
    /// the destination only once the transfer completed.
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest_path.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::DownloadError(format!("request to {} failed: {e}", url)))?;

        if !response.status().is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let temp_path = dest_path.with_extension("tmp");
        let mut file = File::create(&temp_path).map_err(|e| {
            Error::IoError(format!("Failed to create file {}: {e}", temp_path.display()))
        })?;

        if let Err(e) = io::copy(&mut response, &mut file) {
            let _ = fs::remove_file(&temp_path);
            return Err(Error::DownloadError(format!(
                "Failed to write downloaded data from {}: {e}",
                url
            )));
        }
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, dest_path).map_err(|e| {
            Error::IoError(format!(
                "Failed to move {} to {}: {e}",
                temp_path.display(),
                dest_path.display()
            ))
        })?;

        Ok(())
    }
}
