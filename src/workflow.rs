use chrono::{DateTime, Local};
use std::path::Path;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Result, ConvkitError};
use crate::fetch::{CookieStatus, FetchRequest, FetchStrategyEngine, MediaKind};
use crate::media::{MediaCommand, MediaProcessorFactory, MediaProcessorTrait, SegmentEditRequest, StreamSummary};
use crate::storage::{Area, Storage, StoredArtifact, ToolCategory, sanitize_basename, secure_filename, unique_path, unique_stem};
use crate::subtitle::generate_srt;
use crate::timecode::{format_seconds, parse_timecode};
use crate::transcribe::{TranscribeOptions, TranscriberFactory, TranscriberTrait, per_second_lines, render_transcript_pdf};

/// Containers accepted by the video cropper
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "mov", "mkv", "webm", "avi", "m4v"];

/// Audio containers accepted by the transcriber on top of [`VIDEO_EXTENSIONS`]
pub const AUDIO_EXTENSIONS: [&str; 8] = ["mp3", "wav", "m4a", "aac", "flac", "ogg", "wma", "amr"];

/// Duration and stream layout of a local media file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaReport {
    pub duration: f64,
    pub streams: StreamSummary,
}

/// Files produced by a transcription run
#[derive(Debug, Clone)]
pub struct TranscriptOutput {
    pub transcript: StoredArtifact,
    pub subtitles: StoredArtifact,
    pub language: Option<String>,
    pub lines: usize,
}

/// Result of probing one external tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCheck {
    pub name: &'static str,
    pub available: bool,
    pub detail: String,
}

pub struct Workflow {
    config: Config,
    storage: Storage,
    media: Box<dyn MediaProcessorTrait>,
    fetcher: FetchStrategyEngine,
    transcriber: Box<dyn TranscriberTrait>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let storage = Storage::from_config(&config.storage);
        storage.ensure_layout()?;

        let media = MediaProcessorFactory::create_processor(config.media.clone());
        let fetcher = FetchStrategyEngine::with_ytdlp(
            config.fetch.clone(),
            storage.dir(Area::Downloads, ToolCategory::YtVidDownloader),
        );
        let transcriber = TranscriberFactory::create_default(config.transcriber.clone());

        Ok(Self::with_components(config, storage, media, fetcher, transcriber))
    }

    /// Assemble a workflow from already-built parts
    pub fn with_components(
        config: Config,
        storage: Storage,
        media: Box<dyn MediaProcessorTrait>,
        fetcher: FetchStrategyEngine,
        transcriber: Box<dyn TranscriberTrait>,
    ) -> Self {
        Self {
            config,
            storage,
            media,
            fetcher,
            transcriber,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Download a remote video (mp4) or its audio track (mp3)
    pub async fn fetch_media(
        &self,
        url: &str,
        kind: MediaKind,
        output_name: Option<&str>,
        use_cookies: bool,
    ) -> Result<StoredArtifact> {
        let base_name = unique_stem(
            self.fetcher.output_dir(),
            &sanitize_basename(output_name.unwrap_or("video")),
        );
        let request = FetchRequest::new(url, kind, base_name, use_cookies)?;
        info!("Fetching {} as {} ({})", request.url(), request.base_name(), kind);

        let path = self.fetcher.fetch(&request).await?;
        self.storage.artifact(Area::Downloads, ToolCategory::YtVidDownloader, path)
    }

    /// Remove the `[start, end)` range from a local video
    pub async fn crop_video(
        &self,
        input: &Path,
        start: &str,
        end: &str,
        output_name: Option<&str>,
    ) -> Result<StoredArtifact> {
        ensure_extension(input, &VIDEO_EXTENSIONS)?;

        let start = parse_timecode(start)?;
        let end = parse_timecode(end)?;
        if end <= start {
            return Err(ConvkitError::InvalidRange(
                "End time must be greater than start time.".to_string(),
            ));
        }

        let upload = self.storage.import(input, Area::Uploads, ToolCategory::VideoCropper).await?;

        let out_dir = self.storage.dir(Area::Downloads, ToolCategory::VideoCropper);
        tokio::fs::create_dir_all(&out_dir).await?;
        let source_stem = Path::new(&upload.name)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let out_name = crop_output_name(output_name, &source_stem, start, end, Local::now());
        let dest = unique_path(&out_dir, &out_name);

        let request = SegmentEditRequest::new(&upload.path, start, end, dest)?;

        match self.media.duration_seconds(&upload.path).await {
            Ok(duration) => request.validate_within(duration)?,
            Err(e) => warn!("Could not probe {}, skipping range check: {}", upload.path.display(), e),
        }

        self.media.remove_segment(&request).await?;
        self.storage.artifact(Area::Downloads, ToolCategory::VideoCropper, request.dest().to_path_buf())
    }

    /// Per-second transcript plus subtitles for an audio or video file
    pub async fn transcribe_media(
        &self,
        input: &Path,
        model: &str,
        translate: bool,
        output_name: Option<&str>,
    ) -> Result<TranscriptOutput> {
        let mut accepted = AUDIO_EXTENSIONS.to_vec();
        accepted.extend_from_slice(&VIDEO_EXTENSIONS);
        ensure_extension(input, &accepted)?;

        let options = TranscribeOptions::new(model, translate)?;
        let upload = self.storage.import(input, Area::Uploads, ToolCategory::AudioToText).await?;

        let transcription = self.transcriber.transcribe(&upload.path, &options).await?;
        let lines = per_second_lines(&transcription)?;
        info!("Transcribed {} lines", lines.len());

        let display_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| upload.name.clone());
        let pdf = render_transcript_pdf(&display_name, transcription.language.as_deref(), &lines)?;

        let name = transcript_name(output_name, &upload.name, Local::now());
        let transcript = self.storage
            .save(&pdf, Area::Downloads, ToolCategory::AudioToText, &name)
            .await?;

        let srt_name = Path::new(&transcript.name).with_extension("srt");
        let srt_path = unique_path(
            &self.storage.dir(Area::Downloads, ToolCategory::AudioToText),
            &srt_name.to_string_lossy(),
        );
        generate_srt(&transcription, &srt_path).await?;
        let subtitles = self.storage.artifact(Area::Downloads, ToolCategory::AudioToText, srt_path)?;

        Ok(TranscriptOutput {
            transcript,
            subtitles,
            language: transcription.language,
            lines: lines.len(),
        })
    }

    pub async fn probe_media(&self, input: &Path) -> Result<MediaReport> {
        if !input.is_file() {
            return Err(ConvkitError::FileNotFound(input.display().to_string()));
        }

        Ok(MediaReport {
            duration: self.media.duration_seconds(input).await?,
            streams: self.media.stream_summary(input).await?,
        })
    }

    /// Availability of every external tool the workflows call
    pub async fn check_tools(&self) -> Vec<ToolCheck> {
        let mut checks = Vec::new();

        checks.push(match self.media.get_version_info().await {
            Ok(version) => ToolCheck { name: "ffmpeg", available: true, detail: version },
            Err(e) => ToolCheck { name: "ffmpeg", available: false, detail: e.to_string() },
        });

        let ytdlp = MediaCommand::new(&self.config.fetch.binary_path, "yt-dlp version")
            .arg("--version")
            .run()
            .await;
        checks.push(match ytdlp {
            Ok(output) if output.success() => ToolCheck {
                name: "yt-dlp",
                available: true,
                detail: output.stdout.trim().to_string(),
            },
            Ok(output) => ToolCheck { name: "yt-dlp", available: false, detail: output.diagnostic() },
            Err(e) => ToolCheck { name: "yt-dlp", available: false, detail: e.to_string() },
        });

        checks.push(match self.transcriber.check_availability().await {
            Ok(()) => ToolCheck { name: "whisper", available: true, detail: "available".to_string() },
            Err(e) => ToolCheck { name: "whisper", available: false, detail: e.to_string() },
        });

        checks
    }

    pub fn cookie_status(&self) -> CookieStatus {
        self.fetcher.cookies().status()
    }
}

fn ensure_extension(path: &Path, accepted: &[&str]) -> Result<()> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if accepted.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ConvkitError::UnsupportedFormat(format!(
            "{} (allowed: {})",
            path.display(),
            accepted.join(", ")
        )))
    }
}

/// Requested name (secured, `.mp4` added when extensionless) or a timestamped default
fn crop_output_name(
    requested: Option<&str>,
    source_stem: &str,
    start: f64,
    end: f64,
    now: DateTime<Local>,
) -> String {
    let requested = requested.map(secure_filename).filter(|name| !name.is_empty());
    match requested {
        Some(name) if name.contains('.') => name,
        Some(name) => format!("{}.mp4", name),
        None => format!(
            "{}_cropped_{}-{}_{}.mp4",
            source_stem,
            format_seconds(start),
            format_seconds(end),
            now.format("%Y%m%d-%H%M%S")
        ),
    }
}

/// Requested name with `.pdf` appended when missing, or `<stem>_transcript_<timestamp>.pdf`
fn transcript_name(requested: Option<&str>, upload_name: &str, now: DateTime<Local>) -> String {
    match requested.map(secure_filename).filter(|name| !name.is_empty()) {
        Some(name) if name.to_lowercase().ends_with(".pdf") => name,
        Some(name) => format!("{}.pdf", name),
        None => {
            let stem = Path::new(upload_name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "audio".to_string());
            format!("{}_transcript_{}.pdf", stem, now.format("%Y%m%d_%H%M%S"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::MockDownloader;
    use crate::media::{MockMediaProcessorTrait, ToolOutput};
    use crate::transcribe::{MockTranscriberTrait, Transcription, TranscriptionSegment, Word};
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        input_dir: PathBuf,
        workflow: Workflow,
    }

    fn fixture(media: MockMediaProcessorTrait, downloader: MockDownloader, transcriber: MockTranscriberTrait) -> Fixture {
        let root = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.uploads_dir = root.path().join("uploads");
        config.storage.downloads_dir = root.path().join("downloads");
        config.fetch.cookie_file = root.path().join("cookies.txt");

        let storage = Storage::from_config(&config.storage);
        storage.ensure_layout().unwrap();
        let fetcher = FetchStrategyEngine::new(
            config.fetch.clone(),
            storage.dir(Area::Downloads, ToolCategory::YtVidDownloader),
            Box::new(downloader),
        );

        let input_dir = root.path().join("input");
        std::fs::create_dir_all(&input_dir).unwrap();

        let workflow = Workflow::with_components(config, storage, Box::new(media), fetcher, Box::new(transcriber));
        Fixture { _root: root, input_dir, workflow }
    }

    fn input_file(fixture: &Fixture, name: &str) -> PathBuf {
        let path = fixture.input_dir.join(name);
        std::fs::write(&path, b"media").unwrap();
        path
    }

    fn writing_media(duration: Result<f64>) -> MockMediaProcessorTrait {
        let mut media = MockMediaProcessorTrait::new();
        let duration = std::sync::Mutex::new(Some(duration));
        media
            .expect_duration_seconds()
            .returning(move |_| duration.lock().unwrap().take().unwrap());
        media.expect_remove_segment().times(1).returning(|request| {
            std::fs::write(request.dest(), b"cropped").unwrap();
            Ok(())
        });
        media
    }

    #[test]
    fn test_crop_output_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(crop_output_name(Some("my clip"), "talk", 30.0, 45.5, now), "my_clip.mp4");
        assert_eq!(crop_output_name(Some("clip.mov"), "talk", 30.0, 45.5, now), "clip.mov");
        assert_eq!(
            crop_output_name(Some("///"), "talk", 30.0, 45.5, now),
            "talk_cropped_30-45.5_20240309-140507.mp4"
        );
        assert_eq!(
            crop_output_name(None, "talk", 0.0, 12.0, now),
            "talk_cropped_0-12_20240309-140507.mp4"
        );
    }

    #[test]
    fn test_transcript_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(transcript_name(Some("notes"), "talk.mp3", now), "notes.pdf");
        assert_eq!(transcript_name(Some("Notes.PDF"), "talk.mp3", now), "Notes.PDF");
        assert_eq!(transcript_name(Some("my notes.txt"), "talk.mp3", now), "my_notes.txt.pdf");
        assert_eq!(transcript_name(Some("  "), "talk.mp3", now), "talk_transcript_20240309_140507.pdf");
        assert_eq!(transcript_name(None, "talk.mp3", now), "talk_transcript_20240309_140507.pdf");
    }

    #[test]
    fn test_extension_allow_list() {
        assert!(ensure_extension(Path::new("a/Clip.MP4"), &VIDEO_EXTENSIONS).is_ok());
        assert!(matches!(
            ensure_extension(Path::new("notes.txt"), &VIDEO_EXTENSIONS),
            Err(ConvkitError::UnsupportedFormat(_))
        ));
        assert!(ensure_extension(Path::new("noext"), &VIDEO_EXTENSIONS).is_err());
    }

    #[tokio::test]
    async fn test_crop_rejects_unsupported_input_before_storing() {
        let fixture = fixture(MockMediaProcessorTrait::new(), MockDownloader::new(), MockTranscriberTrait::new());
        let input = input_file(&fixture, "notes.txt");

        let result = fixture.workflow.crop_video(&input, "1", "2", None).await;
        assert!(matches!(result, Err(ConvkitError::UnsupportedFormat(_))));

        let uploads = fixture.workflow.storage().list(Area::Uploads, ToolCategory::VideoCropper).unwrap();
        assert!(uploads.is_empty());
    }

    #[tokio::test]
    async fn test_crop_rejects_inverted_range() {
        let fixture = fixture(MockMediaProcessorTrait::new(), MockDownloader::new(), MockTranscriberTrait::new());
        let input = input_file(&fixture, "talk.mp4");

        let result = fixture.workflow.crop_video(&input, "0:45", "0:30", None).await;
        assert!(matches!(result, Err(ConvkitError::InvalidRange(_))));

        let result = fixture.workflow.crop_video(&input, "1:xx", "2:00", None).await;
        assert!(matches!(result, Err(ConvkitError::InvalidTimecode(_))));
    }

    #[tokio::test]
    async fn test_crop_range_past_duration() {
        let mut media = MockMediaProcessorTrait::new();
        media.expect_duration_seconds().returning(|_| Ok(40.0));
        media.expect_remove_segment().never();
        let fixture = fixture(media, MockDownloader::new(), MockTranscriberTrait::new());
        let input = input_file(&fixture, "talk.mp4");

        let result = fixture.workflow.crop_video(&input, "30", "45", None).await;
        assert!(matches!(result, Err(ConvkitError::InvalidRange(_))));
    }

    #[tokio::test]
    async fn test_crop_writes_named_output() {
        let fixture = fixture(writing_media(Ok(60.0)), MockDownloader::new(), MockTranscriberTrait::new());
        let input = input_file(&fixture, "talk.mp4");

        let artifact = fixture.workflow.crop_video(&input, "00:00:30", "45.5", Some("clip")).await.unwrap();

        assert_eq!(artifact.name, "clip.mp4");
        assert_eq!(artifact.category, ToolCategory::VideoCropper);
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"cropped");

        let uploads = fixture.workflow.storage().list(Area::Uploads, ToolCategory::VideoCropper).unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].name, "talk.mp4");
    }

    #[tokio::test]
    async fn test_crop_proceeds_when_probe_fails() {
        let media = writing_media(Err(ConvkitError::Probe("no duration".to_string())));
        let fixture = fixture(media, MockDownloader::new(), MockTranscriberTrait::new());
        let input = input_file(&fixture, "talk.webm");

        let artifact = fixture.workflow.crop_video(&input, "5", "10", None).await.unwrap();
        assert!(artifact.name.starts_with("talk_cropped_5-10_"));
        assert!(artifact.name.ends_with(".mp4"));
    }

    #[tokio::test]
    async fn test_fetch_media_stores_download() {
        let mut downloader = MockDownloader::new();
        downloader.expect_download().times(1).returning(|_, options| {
            let template = options.output_template.to_string_lossy().to_string();
            std::fs::write(template.replace("%(ext)s", "mp3"), b"audio").unwrap();
            Ok(ToolOutput { status: Some(0), ..Default::default() })
        });
        let fixture = fixture(MockMediaProcessorTrait::new(), downloader, MockTranscriberTrait::new());

        let artifact = fixture
            .workflow
            .fetch_media("https://example.com/watch?v=1", MediaKind::Audio, Some("My Song.mp3"), true)
            .await
            .unwrap();

        assert_eq!(artifact.name, "My_Song.mp3");
        assert_eq!(artifact.category, ToolCategory::YtVidDownloader);
        assert_eq!(artifact.size, 5);
    }

    fn webm_downloader(times: usize, body: &'static [u8]) -> MockDownloader {
        let mut downloader = MockDownloader::new();
        downloader.expect_download().times(times).returning(move |_, options| {
            let template = options.output_template.to_string_lossy().to_string();
            std::fs::write(template.replace("%(ext)s", "webm"), body).unwrap();
            Ok(ToolOutput { status: Some(0), ..Default::default() })
        });
        downloader
    }

    #[tokio::test]
    async fn test_fetch_media_skips_earlier_download() {
        let fixture = fixture(MockMediaProcessorTrait::new(), webm_downloader(1, b"second"), MockTranscriberTrait::new());
        let dir = fixture.workflow.storage().dir(Area::Downloads, ToolCategory::YtVidDownloader);
        std::fs::write(dir.join("video.mp4"), b"first").unwrap();

        let artifact = fixture
            .workflow
            .fetch_media("https://example.com/watch?v=2", MediaKind::Video, None, true)
            .await
            .unwrap();

        assert!(artifact.name.starts_with("video_"), "{}", artifact.name);
        assert!(artifact.name.ends_with(".webm"));
        assert_eq!(std::fs::read(&artifact.path).unwrap(), b"second");
        assert_eq!(std::fs::read(dir.join("video.mp4")).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_fetch_media_twice_with_same_name() {
        let fixture = fixture(MockMediaProcessorTrait::new(), webm_downloader(2, b"clip"), MockTranscriberTrait::new());

        let first = fixture
            .workflow
            .fetch_media("https://example.com/watch?v=1", MediaKind::Video, Some("clip"), true)
            .await
            .unwrap();
        let second = fixture
            .workflow
            .fetch_media("https://example.com/watch?v=2", MediaKind::Video, Some("clip"), true)
            .await
            .unwrap();

        assert_eq!(first.name, "clip.webm");
        assert_ne!(first.path, second.path);
        assert!(second.name.starts_with("clip_"));
        let stored = fixture.workflow.storage().list(Area::Downloads, ToolCategory::YtVidDownloader).unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_transcribe_writes_transcript_and_subtitles() {
        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_transcribe().times(1).returning(|_, options| {
            assert_eq!(options.model, "base");
            Ok(Transcription {
                text: "Hello world.".to_string(),
                language: Some("en".to_string()),
                segments: vec![TranscriptionSegment {
                    id: 0,
                    start: 0.0,
                    end: 1.8,
                    text: "Hello world.".to_string(),
                    words: vec![
                        Word { text: " Hello".to_string(), start: Some(0.0), end: Some(0.6) },
                        Word { text: " world.".to_string(), start: Some(1.1), end: Some(1.8) },
                    ],
                }],
            })
        });
        let fixture = fixture(MockMediaProcessorTrait::new(), MockDownloader::new(), transcriber);
        let input = input_file(&fixture, "talk.m4a");

        let output = fixture.workflow.transcribe_media(&input, "base", false, Some("notes")).await.unwrap();

        assert_eq!(output.lines, 2);
        assert_eq!(output.transcript.name, "notes.pdf");
        assert_eq!(output.subtitles.name, "notes.srt");
        assert!(std::fs::read(&output.transcript.path).unwrap().starts_with(b"%PDF-"));
        assert!(std::fs::read_to_string(&output.subtitles.path).unwrap().starts_with("1\n00:00:00,000 --> 00:00:01,800\n"));
    }

    #[tokio::test]
    async fn test_transcribe_without_speech() {
        let mut transcriber = MockTranscriberTrait::new();
        transcriber.expect_transcribe().returning(|_, _| {
            Ok(Transcription { text: String::new(), language: None, segments: vec![] })
        });
        let fixture = fixture(MockMediaProcessorTrait::new(), MockDownloader::new(), transcriber);
        let input = input_file(&fixture, "silence.wav");

        let result = fixture.workflow.transcribe_media(&input, "small", false, None).await;
        assert!(matches!(result, Err(ConvkitError::NoSpeech)));
    }
}
