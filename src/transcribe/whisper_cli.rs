use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use std::path::Path;
use tracing::{info, debug};

use crate::config::TranscriberConfig;
use crate::error::{Result, ConvkitError};
use crate::media::MediaCommand;
use super::{TranscribeOptions, TranscriberTrait, Transcription, TranscriptionMapper, TranscriptionSegment, Word};

/// Whisper command line JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperOutput {
    #[serde(default)]
    pub text: String,
    pub segments: Vec<WhisperSegment>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSegment {
    #[serde(default)]
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub words: Vec<WhisperWord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperWord {
    pub word: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub probability: Option<f64>,
}

/// Mapper for whisper JSON to the service-agnostic format
pub struct WhisperMapper;

impl TranscriptionMapper<WhisperOutput> for WhisperMapper {
    fn to_transcription(output: WhisperOutput) -> Result<Transcription> {
        let segments = output
            .segments
            .into_iter()
            .map(|seg| TranscriptionSegment {
                id: seg.id as i32,
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().to_string(),
                words: seg
                    .words
                    .into_iter()
                    .map(|w| Word { text: w.word, start: w.start, end: w.end })
                    .collect(),
            })
            .collect();

        Ok(Transcription {
            text: output.text.trim().to_string(),
            segments,
            language: output.language,
        })
    }
}

/// Transcriber backed by the `whisper` command line tool
pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    pub fn build_command(&self, media_path: &Path, output_dir: &Path, options: &TranscribeOptions) -> MediaCommand {
        let mut cmd = MediaCommand::new(&self.config.binary_path, "Whisper transcription")
            .path(media_path)
            .opt("--model", &options.model)
            .opt("--task", options.task.as_str())
            .opt("--device", &self.config.device)
            .opt("--word_timestamps", "True")
            .opt("--verbose", "False")
            .opt("--output_format", "json")
            .arg("--output_dir")
            .path(output_dir);

        if let Some(language) = &options.language {
            cmd = cmd.opt("--language", language);
        }

        cmd
    }
}

#[async_trait]
impl TranscriberTrait for WhisperCliTranscriber {
    async fn transcribe(&self, media_path: &Path, options: &TranscribeOptions) -> Result<Transcription> {
        info!(
            "Transcribing {} with model {} ({})",
            media_path.display(),
            options.model,
            options.task.as_str()
        );

        let temp_dir = tempfile::tempdir()
            .map_err(|e| ConvkitError::Transcriber(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let command = self.build_command(media_path, output_dir, options);
        let output = command.run().await
            .map_err(|e| ConvkitError::Transcriber(format!("Failed to execute whisper: {}", e)))?;

        if !output.success() {
            return Err(ConvkitError::Transcriber(format!("Whisper failed: {}", output.diagnostic())));
        }

        let stem = media_path
            .file_stem()
            .ok_or_else(|| ConvkitError::Transcriber("Invalid media filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", stem.to_string_lossy()));
        debug!("Reading whisper output from {}", json_file.display());

        let json_content = tokio::fs::read_to_string(&json_file).await
            .map_err(|e| ConvkitError::Transcriber(format!("Failed to read output: {}", e)))?;

        parse_whisper_json(&json_content)
    }

    async fn check_availability(&self) -> Result<()> {
        let output = MediaCommand::new(&self.config.binary_path, "Whisper help")
            .arg("--help")
            .run()
            .await
            .map_err(|e| ConvkitError::Transcriber(format!("whisper command not found: {}", e)))?;

        if output.success() {
            info!("Whisper command line tool is available");
            Ok(())
        } else {
            Err(ConvkitError::Transcriber(format!("Whisper not available: {}", output.diagnostic())))
        }
    }
}

pub fn parse_whisper_json(content: &str) -> Result<Transcription> {
    let output: WhisperOutput = serde_json::from_str(content)
        .map_err(|e| ConvkitError::Transcriber(format!("Failed to parse whisper JSON: {}", e)))?;
    WhisperMapper::to_transcription(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transcribe::TranscriptionTask;

    const SAMPLE: &str = r#"{
        "text": " Hello world.",
        "segments": [
            {
                "id": 0, "seek": 0, "start": 0.0, "end": 1.8, "text": " Hello world.",
                "tokens": [50364, 2425], "temperature": 0.0, "avg_logprob": -0.2,
                "compression_ratio": 0.8, "no_speech_prob": 0.01,
                "words": [
                    {"word": " Hello", "start": 0.0, "end": 0.6, "probability": 0.98},
                    {"word": " world.", "start": 1.1, "end": 1.8, "probability": 0.95}
                ]
            }
        ],
        "language": "en"
    }"#;

    #[test]
    fn test_parse_whisper_json() {
        let transcription = parse_whisper_json(SAMPLE).unwrap();
        assert_eq!(transcription.language.as_deref(), Some("en"));
        assert_eq!(transcription.text, "Hello world.");
        assert_eq!(transcription.segments.len(), 1);
        assert_eq!(transcription.segments[0].words[1].start, Some(1.1));
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(matches!(parse_whisper_json("{"), Err(ConvkitError::Transcriber(_))));
    }

    #[test]
    fn test_command_arguments() {
        let transcriber = WhisperCliTranscriber::new(Config::default().transcriber);
        let options = TranscribeOptions {
            model: "base".to_string(),
            task: TranscriptionTask::Translate,
            language: None,
        };
        let cmd = transcriber.build_command(Path::new("talk.mp3"), Path::new("/tmp/out"), &options);

        assert_eq!(cmd.binary_path, "whisper");
        assert_eq!(cmd.args[0], "talk.mp3");
        assert!(cmd.args.windows(2).any(|w| w == ["--task", "translate"]));
        assert!(cmd.args.windows(2).any(|w| w == ["--model", "base"]));
        assert!(cmd.args.windows(2).any(|w| w == ["--output_dir", "/tmp/out"]));
        assert!(!cmd.args.contains(&"--language".to_string()));
    }
}
