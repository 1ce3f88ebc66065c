use async_trait::async_trait;
use std::path::Path;
use tracing::{info, debug};

use crate::config::MediaConfig;
use crate::error::{Result, ConvkitError};
use super::{MediaCommandBuilder, MediaProbe, MediaProcessorTrait, SegmentEditRequest, StreamSummary};

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    command_builder: MediaCommandBuilder,
    probe: MediaProbe,
}

impl MediaProcessorImpl {
    /// Create a new media processor implementation
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(config);
        let probe = MediaProbe::new(command_builder.clone());

        Self {
            command_builder,
            probe,
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn duration_seconds(&self, path: &Path) -> Result<f64> {
        self.probe.duration_seconds(path).await
    }

    async fn stream_summary(&self, path: &Path) -> Result<StreamSummary> {
        self.probe.stream_summary(path).await
    }

    async fn remove_segment(&self, request: &SegmentEditRequest) -> Result<()> {
        info!(
            "Removing {:.3}s-{:.3}s from {} -> {}",
            request.start(),
            request.end(),
            request.source().display(),
            request.dest().display()
        );

        let parent_ok = match request.dest().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.is_dir(),
            _ => true,
        };
        if !parent_ok {
            return Err(ConvkitError::Transcode(format!(
                "Output directory does not exist for {}",
                request.dest().display()
            )));
        }

        let filter_graph = request.filter_graph();
        debug!("Filter graph: {}", filter_graph);

        let command = self.command_builder.remove_segment(
            request.source(),
            &filter_graph,
            request.dest(),
        );
        command.execute().await?;

        info!("Segment removal completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let output = self.command_builder.version_check().run().await
            .map_err(|e| ConvkitError::Transcode(format!("Media processor not found: {}", e)))?;

        if output.success() {
            info!("Media processor is available");
            Ok(())
        } else {
            Err(ConvkitError::Transcode("Media processor version check failed".to_string()))
        }
    }

    async fn get_version_info(&self) -> Result<String> {
        debug!("Getting media processor version information");

        let output = self.command_builder.version_check().execute().await?;
        // The first line carries the version banner
        let first_line = output.stdout.lines().next().unwrap_or("Unknown version");
        Ok(first_line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_missing_output_directory_is_rejected_before_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let request = SegmentEditRequest::new(
            dir.path().join("in.mp4"),
            1.0,
            2.0,
            dir.path().join("missing").join("out.mp4"),
        )
        .unwrap();

        let processor = MediaProcessorImpl::new(Config::default().media);
        let result = processor.remove_segment(&request).await;
        assert!(matches!(result, Err(ConvkitError::Transcode(_))));
    }

    #[tokio::test]
    async fn test_transcoder_failure_carries_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let request = SegmentEditRequest::new(
            dir.path().join("in.mp4"),
            1.0,
            2.0,
            dir.path().join("out.mp4"),
        )
        .unwrap();

        let config = MediaConfig {
            binary_path: "/nonexistent/ffmpeg".to_string(),
            ..Config::default().media
        };
        let processor = MediaProcessorImpl::new(config);
        let err = processor.remove_segment(&request).await.unwrap_err();
        assert!(err.to_string().contains("/nonexistent/ffmpeg"));
    }
}
