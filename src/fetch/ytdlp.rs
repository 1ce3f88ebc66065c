use async_trait::async_trait;
use tracing::debug;

use crate::config::FetchConfig;
use crate::error::Result;
use crate::media::{MediaCommand, ToolOutput};
use super::{DownloadOptions, Downloader, MediaKind};

/// Downloader backed by the yt-dlp command line tool
#[derive(Debug, Clone)]
pub struct YtDlpDownloader {
    binary_path: String,
}

impl YtDlpDownloader {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            binary_path: config.binary_path.clone(),
        }
    }

    /// Build one download invocation.
    ///
    /// Headers and chunking are left to yt-dlp defaults.
    pub fn build_command(&self, url: &str, options: &DownloadOptions) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.binary_path, format!("yt-dlp download ({})", options.client))
            .arg("-o")
            .path(&options.output_template)
            .opt("--retries", options.retries.to_string())
            .opt("--fragment-retries", options.fragment_retries.to_string())
            .opt("--socket-timeout", options.socket_timeout.to_string())
            .arg("--geo-bypass")
            .arg("--force-ipv4")
            .arg("--no-playlist")
            .opt("--extractor-args", format!("youtube:player_client={}", options.client))
            .opt("-f", &options.format);

        if let Some(cookie_file) = &options.cookie_file {
            cmd = cmd.arg("--cookies").path(cookie_file);
        }

        if let Some(container) = &options.merge_output_format {
            cmd = cmd.opt("--merge-output-format", container);
        }

        cmd = match options.kind {
            MediaKind::Audio => cmd
                .arg("--extract-audio")
                .opt("--audio-format", "mp3")
                .opt("--audio-quality", "0"),
            MediaKind::Video => cmd.opt("--remux-video", "mp4"),
        };

        cmd.arg(url)
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<ToolOutput> {
        let command = self.build_command(url, options);
        let output = command.run().await?;
        debug!("yt-dlp exited with {:?}", output.status);
        Ok(output)
    }
}
