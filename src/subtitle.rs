use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::Result;
use crate::transcribe::Transcription;

/// Generate SRT subtitle file from transcription
pub async fn generate_srt<P: AsRef<Path>>(
    transcription: &Transcription,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    fs::write(output_path, render_srt(transcription)).await?;

    info!("SRT file generated successfully");
    Ok(())
}

/// SRT document for the non-empty segments of a transcription
pub fn render_srt(transcription: &Transcription) -> String {
    let mut srt_content = String::new();

    let segments = transcription.segments.iter().filter(|s| !s.text.trim().is_empty());
    for (index, segment) in segments.enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_srt_time(segment.start),
            format_srt_time(segment.end),
            segment.text.trim()
        ));
    }

    srt_content
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(seconds: f64) -> String {
    let total_milliseconds = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}
