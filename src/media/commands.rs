use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::config::MediaConfig;
use crate::error::{Result, ConvkitError};

/// Captured result of an external tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Most useful diagnostic text: stderr, falling back to stdout and then the exit code
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.status {
            Some(code) => format!("exited with code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Abstract external tool command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a flag followed by its value
    pub fn opt<S1: Into<String>, S2: Into<String>>(self, flag: S1, value: S2) -> Self {
        self.arg(flag).arg(value)
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.path(path)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.opt("-c:v", codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.opt("-c:a", codec)
    }

    /// Add a complex filter graph
    pub fn filter_complex<S: Into<String>>(self, graph: S) -> Self {
        self.opt("-filter_complex", graph)
    }

    /// Map a stream or filter graph label into the output
    pub fn map<S: Into<String>>(self, label: S) -> Self {
        self.opt("-map", label)
    }

    /// Move the index to the front of the file so playback can start early
    pub fn faststart(self) -> Self {
        self.opt("-movflags", "+faststart")
    }

    /// Run the command and capture its output.
    ///
    /// Only a failure to spawn is reported as an error; a non-zero exit is
    /// returned in [`ToolOutput::status`] for the caller to classify.
    pub async fn run(&self) -> std::io::Result<ToolOutput> {
        debug!("Executing external tool: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await?;

        Ok(ToolOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Execute the command, treating a non-zero exit as a transcode failure
    pub async fn execute(&self) -> Result<ToolOutput> {
        let output = self.run().await
            .map_err(|e| ConvkitError::Transcode(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.success() {
            return Err(ConvkitError::Transcode(format!(
                "{} failed: {}",
                self.description,
                output.diagnostic()
            )));
        }

        Ok(output)
    }
}

/// Builder for the ffmpeg/ffprobe invocations used by the media tools
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    config: MediaConfig,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Build the trim+concat re-encode command for a prepared filter graph
    pub fn remove_segment<P: AsRef<Path>>(
        &self,
        source: P,
        filter_graph: &str,
        dest: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Segment removal")
            .overwrite()
            .input(source)
            .filter_complex(filter_graph)
            .map("[v]")
            .map("[a]")
            .video_codec(&self.config.video_codec)
            .audio_codec(&self.config.audio_codec)
            .faststart()
            .opt("-preset", &self.config.preset)
            .opt("-crf", self.config.crf.to_string())
            .output(dest)
    }

    /// Build the container duration query
    pub fn probe_duration<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.config.probe_path, "Duration probe")
            .opt("-v", "error")
            .opt("-show_entries", "format=duration")
            .opt("-of", "default=noprint_wrappers=1:nokey=1")
            .path(path)
    }

    /// Build the per-stream codec type query
    pub fn probe_streams<P: AsRef<Path>>(&self, path: P) -> MediaCommand {
        MediaCommand::new(&self.config.probe_path, "Stream probe")
            .opt("-v", "error")
            .opt("-show_entries", "stream=codec_type")
            .opt("-of", "csv=p=0")
            .path(path)
    }

    /// Build version check command
    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.config.binary_path, "Version check")
            .arg("-version")
    }
}
