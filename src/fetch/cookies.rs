use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, ConvkitError};

/// Opaque on-disk cookie bundle shared by cookie-eligible client profiles
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
}

/// Presence report for the cookie bundle
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CookieStatus {
    pub cookiefile: PathBuf,
    pub exists: bool,
    pub size: u64,
}

impl CookieJar {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The bundle counts only when the file exists and is non-empty
    pub fn is_available(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false)
    }

    pub fn status(&self) -> CookieStatus {
        let metadata = std::fs::metadata(&self.path).ok();
        CookieStatus {
            cookiefile: self.path.clone(),
            exists: metadata.is_some(),
            size: metadata.map(|m| m.len()).unwrap_or(0),
        }
    }

    /// Write the decoded bundle unless a cookie file already exists.
    ///
    /// Returns whether the file was written.
    pub fn bootstrap_from_base64(&self, payload: &str) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| ConvkitError::Credentials(format!("Invalid base64 cookie payload: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, &bytes).map_err(|e| {
            warn!("Failed to write cookie file {}: {}", self.path.display(), e);
            ConvkitError::Credentials(format!("Failed to write cookie file: {}", e))
        })?;

        info!("Wrote cookie file {} ({} bytes)", self.path.display(), bytes.len());
        Ok(true)
    }
}
