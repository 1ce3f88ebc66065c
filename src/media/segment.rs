use std::path::{Path, PathBuf};

use crate::error::{Result, ConvkitError};

/// Request to excise `[start, end)` from a media file
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentEditRequest {
    source: PathBuf,
    start: f64,
    end: f64,
    dest: PathBuf,
}

impl SegmentEditRequest {
    /// Offsets are seconds; requires `0 <= start < end`
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(source: P, start: f64, end: f64, dest: Q) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(ConvkitError::InvalidRange("offsets must be finite numbers".to_string()));
        }
        if start < 0.0 {
            return Err(ConvkitError::InvalidRange(format!("start {} is negative", start)));
        }
        if end <= start {
            return Err(ConvkitError::InvalidRange(
                "End time must be greater than start time.".to_string(),
            ));
        }

        Ok(Self {
            source: source.into(),
            start,
            end,
            dest: dest.into(),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Reject ranges reaching past the probed source duration
    pub fn validate_within(&self, duration: f64) -> Result<()> {
        if self.end > duration {
            return Err(ConvkitError::InvalidRange(format!(
                "Times must be within video duration ({:.2}s).",
                duration
            )));
        }
        Ok(())
    }

    /// Expected output duration for a source of the given length
    pub fn expected_duration(&self, source_duration: f64) -> f64 {
        (source_duration - (self.end - self.start)).max(0.0)
    }

    /// Filter graph keeping `[0, start)` and `[end, EOF]`, each rebased to zero and concatenated.
    ///
    /// A range starting at zero has no head fragment, so only the tail is kept.
    pub fn filter_graph(&self) -> String {
        let (start, end) = (self.start, self.end);

        if start == 0.0 {
            return format!(
                "[0:v]trim=start={end},setpts=PTS-STARTPTS[v];\
                 [0:a]atrim=start={end},asetpts=PTS-STARTPTS[a]"
            );
        }

        format!(
            "[0:v]trim=end={start},setpts=PTS-STARTPTS[v0];\
             [0:a]atrim=end={start},asetpts=PTS-STARTPTS[a0];\
             [0:v]trim=start={end},setpts=PTS-STARTPTS[v1];\
             [0:a]atrim=start={end},asetpts=PTS-STARTPTS[a1];\
             [v0][a0][v1][a1]concat=n=2:v=1:a=1[v][a]"
        )
    }
}
