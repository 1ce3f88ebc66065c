// Remote media retrieval
//
// The remote service serves different formats depending on the simulated client
// and on the exact format expression, so a fetch walks a fixed priority list of
// client profiles and, per profile, a fixed list of format recipes until one
// combination succeeds.
//
// - ytdlp: the external downloader wrapper
// - cookies: the optional shared cookie bundle

pub mod cookies;
pub mod ytdlp;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

pub use cookies::*;
pub use ytdlp::*;

use crate::config::FetchConfig;
use crate::error::{Result, ConvkitError};
use crate::media::ToolOutput;
use crate::resolve;

/// Kind of artifact a fetch should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn canonical_extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Audio => "mp3",
        }
    }

    /// Format recipes in retry order
    pub fn recipes(&self) -> &'static [FormatRecipe] {
        match self {
            MediaKind::Video => &VIDEO_RECIPES,
            MediaKind::Audio => &AUDIO_RECIPES,
        }
    }
}

impl FromStr for MediaKind {
    type Err = ConvkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mp4" | "video" => Ok(MediaKind::Video),
            "mp3" | "audio" => Ok(MediaKind::Audio),
            _ => Err(ConvkitError::UnsupportedFormat(format!(
                "Invalid format selection '{}'. Valid formats: mp4, mp3",
                s
            ))),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_extension())
    }
}

/// Simulated client identity presented to the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientProfile {
    pub identity: &'static str,
    pub cookies_eligible: bool,
}

/// Format selector plus the container to force when merging, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRecipe {
    pub selector: &'static str,
    pub merge_to: Option<&'static str>,
}

/// Client priority, broad to narrow credential usage
pub const CLIENT_PROFILES: [ClientProfile; 5] = [
    ClientProfile { identity: "web", cookies_eligible: true },
    ClientProfile { identity: "ios", cookies_eligible: true },
    ClientProfile { identity: "android", cookies_eligible: true },
    ClientProfile { identity: "web", cookies_eligible: false },
    ClientProfile { identity: "android", cookies_eligible: false },
];

/// Video recipes: mp4-compatible pairs first, then anything, then a single muxed file
pub const VIDEO_RECIPES: [FormatRecipe; 4] = [
    FormatRecipe {
        selector: "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]",
        merge_to: Some("mp4"),
    },
    FormatRecipe {
        selector: "(bv*[vcodec*=avc1]/bv*)+(ba[acodec*=mp4a]/ba)/best",
        merge_to: Some("mp4"),
    },
    // May be webm/opus; forcing mp4 here makes the merge fail
    FormatRecipe {
        selector: "bv*+ba/best",
        merge_to: None,
    },
    FormatRecipe {
        selector: "best",
        merge_to: None,
    },
];

pub const AUDIO_RECIPES: [FormatRecipe; 1] = [FormatRecipe {
    selector: "bestaudio/best",
    merge_to: None,
}];

/// Diagnostic fragments that mark a failure as worth another combination
const RETRYABLE_MARKERS: [&str; 3] = ["Requested format is not available", "403", "Forbidden"];

/// One remote media retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    url: String,
    kind: MediaKind,
    base_name: String,
    use_cookies: bool,
}

impl FetchRequest {
    pub fn new<S1: Into<String>, S2: Into<String>>(
        url: S1,
        kind: MediaKind,
        base_name: S2,
        use_cookies: bool,
    ) -> Result<Self> {
        let url = url.into().trim().to_string();
        if url.is_empty() {
            return Err(ConvkitError::Config("Please provide a video URL.".to_string()));
        }
        let base_name = base_name.into();
        if base_name.is_empty() || base_name.contains(['/', '\\']) {
            return Err(ConvkitError::Config(format!("Invalid output base name '{}'", base_name)));
        }

        Ok(Self { url, kind, base_name, use_cookies })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn use_cookies(&self) -> bool {
        self.use_cookies
    }
}

/// Everything the downloader needs for a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Output path with an `%(ext)s` placeholder for the downloader
    pub output_template: PathBuf,
    pub format: String,
    pub client: String,
    pub cookie_file: Option<PathBuf>,
    pub merge_output_format: Option<String>,
    pub kind: MediaKind,
    pub retries: u32,
    pub fragment_retries: u32,
    pub socket_timeout: u32,
}

/// Result of one (profile, recipe) attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(PathBuf),
    /// Try the next recipe
    RetryableFailure(String),
    /// Abandon the remaining recipes for the current profile
    FatalFailure(String),
}

impl AttemptOutcome {
    /// Classify a failed download by its diagnostic text.
    ///
    /// Substring matching on upstream messages; brittle if the downloader rewords them.
    pub fn classify_failure(diagnostic: String) -> Self {
        if RETRYABLE_MARKERS.iter().any(|marker| diagnostic.contains(marker)) {
            AttemptOutcome::RetryableFailure(diagnostic)
        } else {
            AttemptOutcome::FatalFailure(diagnostic)
        }
    }

    /// Classify a non-zero exit. An exit with no output at all moves on to the next recipe.
    pub fn from_failed_exit(output: &ToolOutput) -> Self {
        if output.stderr.trim().is_empty() && output.stdout.trim().is_empty() {
            AttemptOutcome::RetryableFailure(output.diagnostic())
        } else {
            AttemptOutcome::classify_failure(output.diagnostic())
        }
    }
}

/// External downloader seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Run one download; an error means the tool could not be run at all
    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<ToolOutput>;
}

/// Ordered client/format retry state machine over a [`Downloader`]
pub struct FetchStrategyEngine {
    config: FetchConfig,
    output_dir: PathBuf,
    cookies: CookieJar,
    downloader: Box<dyn Downloader>,
}

impl FetchStrategyEngine {
    pub fn new(config: FetchConfig, output_dir: PathBuf, downloader: Box<dyn Downloader>) -> Self {
        let cookies = CookieJar::new(config.cookie_file.clone());
        Self {
            config,
            output_dir,
            cookies,
            downloader,
        }
    }

    /// Engine wired to the yt-dlp command line tool
    pub fn with_ytdlp(config: FetchConfig, output_dir: PathBuf) -> Self {
        let downloader = Box::new(YtDlpDownloader::new(&config));
        Self::new(config, output_dir, downloader)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    /// Fetch the requested media, returning the path of the produced file.
    ///
    /// Attempts run strictly one after another since every attempt writes to the
    /// same output template.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<PathBuf> {
        let mut last_reason: Option<String> = None;

        for profile in CLIENT_PROFILES.iter() {
            for recipe in request.kind().recipes() {
                let options = self.options_for(request, profile, recipe);
                info!(
                    "Trying client={} cookies={} fmt='{}' merge_to={:?}",
                    profile.identity,
                    options.cookie_file.is_some(),
                    recipe.selector,
                    recipe.merge_to
                );

                match self.attempt(request, &options).await? {
                    AttemptOutcome::Success(path) => {
                        info!("Success with client={} fmt='{}'", profile.identity, recipe.selector);
                        return Ok(path);
                    }
                    AttemptOutcome::RetryableFailure(reason) => {
                        warn!("Retryable failure with client={}: {}", profile.identity, reason);
                        last_reason = Some(reason);
                    }
                    AttemptOutcome::FatalFailure(reason) => {
                        warn!("Giving up on client={}: {}", profile.identity, reason);
                        last_reason = Some(reason);
                        break;
                    }
                }
            }
        }

        Err(ConvkitError::FetchExhausted(
            last_reason.unwrap_or_else(|| "no download attempts were made".to_string()),
        ))
    }

    fn options_for(&self, request: &FetchRequest, profile: &ClientProfile, recipe: &FormatRecipe) -> DownloadOptions {
        let cookie_file = if request.use_cookies() && profile.cookies_eligible && self.cookies.is_available() {
            Some(self.cookies.path().to_path_buf())
        } else {
            None
        };

        DownloadOptions {
            output_template: self.output_dir.join(format!("{}.%(ext)s", request.base_name())),
            format: recipe.selector.to_string(),
            client: profile.identity.to_string(),
            cookie_file,
            merge_output_format: recipe.merge_to.map(str::to_string),
            kind: request.kind(),
            retries: self.config.retries,
            fragment_retries: self.config.fragment_retries,
            socket_timeout: self.config.socket_timeout,
        }
    }

    async fn attempt(&self, request: &FetchRequest, options: &DownloadOptions) -> Result<AttemptOutcome> {
        match self.downloader.download(request.url(), options).await {
            Ok(output) if output.success() => {
                // The tool reported success; a missing file is an environment problem, not retried
                let path = resolve::locate(&self.output_dir, request.base_name(), request.kind())?;
                Ok(AttemptOutcome::Success(path))
            }
            Ok(output) => Ok(AttemptOutcome::from_failed_exit(&output)),
            Err(e) => Ok(AttemptOutcome::FatalFailure(e.to_string())),
        }
    }
}
