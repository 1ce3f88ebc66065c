use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::error::{Result, ConvkitError};
use crate::timecode::format_hms;

/// A timed word inside a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    pub id: i32,
    pub start: f64,
    pub end: f64,
    pub text: String,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// Service-agnostic transcription result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<TranscriptionSegment>,
    pub language: Option<String>,
}

/// One transcript line: everything spoken during a given second
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub second: u64,
    pub text: String,
}

impl TranscriptLine {
    pub fn render(&self) -> String {
        format!("{}  {}", format_hms(self.second), self.text)
    }
}

/// Trait for converting service-specific transcription formats
pub trait TranscriptionMapper<T> {
    fn to_transcription(service_result: T) -> Result<Transcription>;
}

/// Bin words by the second they start in.
///
/// Segments without word timings land in the second their segment starts.
/// Fails with [`ConvkitError::NoSpeech`] when nothing was recognised.
pub fn per_second_lines(transcription: &Transcription) -> Result<Vec<TranscriptLine>> {
    let mut bins: BTreeMap<u64, Vec<String>> = BTreeMap::new();

    for segment in &transcription.segments {
        if segment.words.is_empty() {
            let text = segment.text.trim();
            if !text.is_empty() {
                bins.entry(second_of(segment.start)).or_default().push(text.to_string());
            }
            continue;
        }

        for word in &segment.words {
            let text = word.text.trim();
            let Some(start) = word.start else { continue };
            if text.is_empty() {
                continue;
            }
            bins.entry(second_of(start)).or_default().push(text.to_string());
        }
    }

    if bins.is_empty() {
        return Err(ConvkitError::NoSpeech);
    }

    Ok(bins
        .into_iter()
        .map(|(second, words)| TranscriptLine {
            second,
            text: tidy_punctuation(&words.join(" ")),
        })
        .collect())
}

/// Heading shown above the transcript lines
pub fn transcript_title(input_name: &str, language: Option<&str>) -> String {
    format!(
        "Second-by-Second Transcript - {} ({})",
        input_name,
        language.unwrap_or("auto")
    )
}

fn second_of(start: f64) -> u64 {
    if start.is_finite() && start > 0.0 { start.floor() as u64 } else { 0 }
}

fn tidy_punctuation(text: &str) -> String {
    let mut tidy = text.to_string();
    for mark in [",", ".", "!", "?", ":", ";"] {
        tidy = tidy.replace(&format!(" {}", mark), mark);
    }
    tidy.trim().to_string()
}
