// Media processing built on ffmpeg and ffprobe
//
// - Commands: external tool command builder and captured output
// - Probe: duration and stream composition queries
// - Segment: time-range removal requests and their filter graphs
// - Processor: ffmpeg-backed implementation of the processing trait

pub mod commands;
pub mod probe;
pub mod segment;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::*;
pub use probe::*;
pub use segment::*;
pub use processor::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Container duration in seconds
    async fn duration_seconds(&self, path: &Path) -> Result<f64>;

    /// Stream composition of a media file
    async fn stream_summary(&self, path: &Path) -> Result<StreamSummary>;

    /// Re-encode the source with the requested range excised
    async fn remove_segment(&self, request: &SegmentEditRequest) -> Result<()>;

    /// Check if media processor is available
    async fn check_availability(&self) -> Result<()>;

    /// Get media processor version information
    async fn get_version_info(&self) -> Result<String>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(processor::MediaProcessorImpl::new(config))
    }
}
