use std::path::Path;
use tracing::debug;

use crate::error::{Result, ConvkitError};
use super::{MediaCommand, MediaCommandBuilder};

/// Stream composition of a media file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub video: usize,
    pub audio: usize,
    pub other: usize,
}

/// Read-only duration and stream queries through ffprobe
#[derive(Debug, Clone)]
pub struct MediaProbe {
    command_builder: MediaCommandBuilder,
}

impl MediaProbe {
    pub fn new(command_builder: MediaCommandBuilder) -> Self {
        Self { command_builder }
    }

    /// Container duration in seconds
    pub async fn duration_seconds(&self, path: &Path) -> Result<f64> {
        let stdout = run_probe(self.command_builder.probe_duration(path)).await?;
        let duration = parse_duration(&stdout)?;
        debug!("Probed duration of {}: {:.3}s", path.display(), duration);
        Ok(duration)
    }

    /// Number of video, audio and other streams
    pub async fn stream_summary(&self, path: &Path) -> Result<StreamSummary> {
        let stdout = run_probe(self.command_builder.probe_streams(path)).await?;
        Ok(parse_stream_summary(&stdout))
    }
}

async fn run_probe(command: MediaCommand) -> Result<String> {
    let output = command.run().await
        .map_err(|e| ConvkitError::Probe(format!("Failed to execute {}: {}", command.binary_path, e)))?;

    if !output.success() {
        return Err(ConvkitError::Probe(format!(
            "{} failed: {}",
            command.description,
            output.diagnostic()
        )));
    }

    Ok(output.stdout)
}

fn parse_duration(stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    let duration: f64 = value
        .parse()
        .map_err(|_| ConvkitError::Probe(format!("Non-numeric duration output: '{}'", value)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(ConvkitError::Probe(format!("Invalid duration: {}", duration)));
    }

    Ok(duration)
}

fn parse_stream_summary(stdout: &str) -> StreamSummary {
    let mut summary = StreamSummary::default();
    for line in stdout.lines().map(|l| l.trim().trim_end_matches(',')) {
        match line {
            "" => {}
            "video" => summary.video += 1,
            "audio" => summary.audio += 1,
            _ => summary.other += 1,
        }
    }
    summary
}
