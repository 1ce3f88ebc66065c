//! convkit - file conversion toolbox
//!
//! Fetches remote media through yt-dlp with an ordered client/format fallback,
//! removes time ranges from videos with ffmpeg, writes per-second transcripts
//! with whisper and keeps every produced file in a per-tool storage layout.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod media;
pub mod resolve;
pub mod storage;
pub mod subtitle;
pub mod timecode;
pub mod transcribe;
pub mod workflow;
