// Speech to text through external transcription tools
//
// To add another transcription service:
// 1. Create service-specific data structures for parsing its output
// 2. Implement TranscriptionMapper for them
// 3. Add the service to TranscriberImplementation
// 4. Update the factory to create it

pub mod common;
pub mod pdf;
pub mod whisper_cli;

use async_trait::async_trait;
use std::path::Path;

pub use common::*;
pub use pdf::render_transcript_pdf;
use crate::config::TranscriberConfig;
use crate::error::{Result, ConvkitError};

/// Whether to keep the source language or translate to English
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionTask {
    Transcribe,
    Translate,
}

impl TranscriptionTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionTask::Transcribe => "transcribe",
            TranscriptionTask::Translate => "translate",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Model size (tiny, base, small, medium, large)
    pub model: String,
    pub task: TranscriptionTask,
    /// Source language hint, auto-detected when absent
    pub language: Option<String>,
}

impl TranscribeOptions {
    pub fn new<S: Into<String>>(model: S, translate: bool) -> Result<Self> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(ConvkitError::Config("Model size must not be empty".to_string()));
        }
        Ok(Self {
            model,
            task: if translate { TranscriptionTask::Translate } else { TranscriptionTask::Transcribe },
            language: None,
        })
    }
}

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe an audio or video file
    async fn transcribe(&self, media_path: &Path, options: &TranscribeOptions) -> Result<Transcription>;

    /// Check if the transcription tool is available
    async fn check_availability(&self) -> Result<()>;
}

/// Transcriber implementation type
#[derive(Debug, Clone)]
pub enum TranscriberImplementation {
    WhisperCli,
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_transcriber(
        implementation: TranscriberImplementation,
        config: TranscriberConfig,
    ) -> Box<dyn TranscriberTrait> {
        match implementation {
            TranscriberImplementation::WhisperCli => {
                Box::new(whisper_cli::WhisperCliTranscriber::new(config))
            }
        }
    }

    pub fn create_default(config: TranscriberConfig) -> Box<dyn TranscriberTrait> {
        Self::create_transcriber(TranscriberImplementation::WhisperCli, config)
    }
}
