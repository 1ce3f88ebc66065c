//! Per-tool upload and download directories.
//!
//! Layout: `<uploads_root>/<tool>/` and `<downloads_root>/<tool>/`. Artifacts are
//! written once and never modified; listings are newest-first by modification
//! time. Name collisions get a short random suffix, checked before writing
//! without a lock, so two concurrent writers of the same name can still race.

use chrono::{DateTime, Local};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::StorageConfig;
use crate::error::{Result, ConvkitError};

/// Tool whose files a directory holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCategory {
    PdfDecrypter,
    PdfEncrypter,
    PdfCombiner,
    PdfSplitter,
    YtVidDownloader,
    VideoCropper,
    AudioToText,
    ImageCombiner,
    ImageSketch,
    ImageBackgroundRemover,
    ImageToPuzzle,
}

impl ToolCategory {
    pub const ALL: [ToolCategory; 11] = [
        ToolCategory::PdfDecrypter,
        ToolCategory::PdfEncrypter,
        ToolCategory::PdfCombiner,
        ToolCategory::PdfSplitter,
        ToolCategory::YtVidDownloader,
        ToolCategory::VideoCropper,
        ToolCategory::AudioToText,
        ToolCategory::ImageCombiner,
        ToolCategory::ImageSketch,
        ToolCategory::ImageBackgroundRemover,
        ToolCategory::ImageToPuzzle,
    ];

    /// Directory name of the tool
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::PdfDecrypter => "pdf_decrypter",
            ToolCategory::PdfEncrypter => "pdf_encrypter",
            ToolCategory::PdfCombiner => "pdf_combiner",
            ToolCategory::PdfSplitter => "pdf_splitter",
            ToolCategory::YtVidDownloader => "yt_vid_downloader",
            ToolCategory::VideoCropper => "video_cropper",
            ToolCategory::AudioToText => "audio_to_text",
            ToolCategory::ImageCombiner => "image_combiner",
            ToolCategory::ImageSketch => "image_sketch",
            ToolCategory::ImageBackgroundRemover => "image_background_remover",
            ToolCategory::ImageToPuzzle => "image_to_puzzle",
        }
    }
}

impl FromStr for ToolCategory {
    type Err = ConvkitError;

    fn from_str(s: &str) -> Result<Self> {
        ToolCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| ConvkitError::Storage(format!("Unknown tool category '{}'", s)))
    }
}

impl fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs or outputs side of the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Uploads,
    Downloads,
}

impl FromStr for Area {
    type Err = ConvkitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "uploads" | "upload" => Ok(Area::Uploads),
            "downloads" | "download" => Ok(Area::Downloads),
            _ => Err(ConvkitError::Storage(format!(
                "Unknown area '{}'. Valid areas: uploads, downloads",
                s
            ))),
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Area::Uploads => f.write_str("uploads"),
            Area::Downloads => f.write_str("downloads"),
        }
    }
}

/// A file owned by the storage layout
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub area: Area,
    pub category: ToolCategory,
    pub name: String,
    pub path: PathBuf,
    pub modified: DateTime<Local>,
    pub size: u64,
}

impl StoredArtifact {
    fn from_path(area: Area, category: ToolCategory, path: PathBuf) -> Result<Self> {
        let metadata = std::fs::metadata(&path)?;
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            area,
            category,
            name,
            path,
            modified: DateTime::<Local>::from(modified),
            size: metadata.len(),
        })
    }
}

/// Filesystem-backed storage gateway
#[derive(Debug, Clone)]
pub struct Storage {
    uploads_root: PathBuf,
    downloads_root: PathBuf,
}

impl Storage {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(uploads_root: P, downloads_root: Q) -> Self {
        Self {
            uploads_root: uploads_root.into(),
            downloads_root: downloads_root.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.uploads_dir.clone(), config.downloads_dir.clone())
    }

    /// Create every per-tool directory
    pub fn ensure_layout(&self) -> Result<()> {
        for area in [Area::Uploads, Area::Downloads] {
            for category in ToolCategory::ALL {
                std::fs::create_dir_all(self.dir(area, category))?;
            }
        }
        debug!(
            "Storage layout ready under {} and {}",
            self.uploads_root.display(),
            self.downloads_root.display()
        );
        Ok(())
    }

    pub fn dir(&self, area: Area, category: ToolCategory) -> PathBuf {
        let root = match area {
            Area::Uploads => &self.uploads_root,
            Area::Downloads => &self.downloads_root,
        };
        root.join(category.as_str())
    }

    /// Persist raw bytes under a sanitized, collision-free name
    pub async fn save(&self, bytes: &[u8], area: Area, category: ToolCategory, name: &str) -> Result<StoredArtifact> {
        let dir = self.dir(area, category);
        tokio::fs::create_dir_all(&dir).await?;

        let path = unique_path(&dir, &secure_filename(name));
        tokio::fs::write(&path, bytes).await?;

        info!("Saved {} ({} bytes)", path.display(), bytes.len());
        StoredArtifact::from_path(area, category, path)
    }

    /// Copy a local file into the layout, keeping its sanitized name
    pub async fn import(&self, source: &Path, area: Area, category: ToolCategory) -> Result<StoredArtifact> {
        if !source.is_file() {
            return Err(ConvkitError::FileNotFound(source.display().to_string()));
        }

        let dir = self.dir(area, category);
        tokio::fs::create_dir_all(&dir).await?;

        let original = source
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let path = unique_path(&dir, &secure_filename(&original));
        tokio::fs::copy(source, &path).await?;

        info!("Stored {} as {}", source.display(), path.display());
        StoredArtifact::from_path(area, category, path)
    }

    /// Wrap a file some tool already wrote inside the layout
    pub fn artifact(&self, area: Area, category: ToolCategory, path: PathBuf) -> Result<StoredArtifact> {
        StoredArtifact::from_path(area, category, path)
    }

    /// Files newest-first
    pub fn list(&self, area: Area, category: ToolCategory) -> Result<Vec<StoredArtifact>> {
        let dir = self.dir(area, category);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            // Entries can vanish between the scan and the stat
            if let Ok(artifact) = StoredArtifact::from_path(area, category, entry.into_path()) {
                files.push(artifact);
            }
        }

        files.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    /// File count per tool
    pub fn counts(&self, area: Area) -> Result<Vec<(ToolCategory, usize)>> {
        ToolCategory::ALL
            .iter()
            .map(|&category| Ok((category, self.list(area, category)?.len())))
            .collect()
    }

    /// Path of a stored file, refusing anything outside the tool directory
    pub fn serve(&self, area: Area, category: ToolCategory, name: &str) -> Result<PathBuf> {
        let path = self.checked_path(area, category, name)?;
        if !path.is_file() {
            return Err(ConvkitError::FileNotFound(name.to_string()));
        }
        Ok(path)
    }

    pub async fn read(&self, area: Area, category: ToolCategory, name: &str) -> Result<Vec<u8>> {
        let path = self.serve(area, category, name)?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Remove a stored file; `false` when it did not exist
    pub async fn delete(&self, area: Area, category: ToolCategory, name: &str) -> Result<bool> {
        let path = self.checked_path(area, category, name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn checked_path(&self, area: Area, category: ToolCategory, name: &str) -> Result<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().is_some();
        if !plain {
            return Err(ConvkitError::Storage(format!("Invalid file name '{}'", name)));
        }
        Ok(self.dir(area, category).join(name))
    }
}

/// ASCII-only file name safe to place in a flat directory.
///
/// Path separators become spaces, whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.`/`_` are stripped. May
/// return an empty string.
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .filter(|c| c.is_ascii())
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Sanitized stem of a user-supplied name, `video` when nothing usable remains
pub fn sanitize_basename(name: &str) -> String {
    let name = name.trim().replace(['/', '\\'], " ");
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let base = secure_filename(&stem);
    if base.is_empty() { "video".to_string() } else { base }
}

/// `name` inside `dir`, or `stem_<token>.ext` when that name is taken
pub fn unique_path(dir: &Path, name: &str) -> PathBuf {
    let name = if name.is_empty() { "file" } else { name };
    let candidate = dir.join(name);
    if !candidate.exists() {
        return candidate;
    }

    let path = Path::new(name);
    let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
    let token = collision_token();

    match path.extension() {
        Some(ext) => dir.join(format!("{}_{}.{}", stem, token, ext.to_string_lossy())),
        None => dir.join(format!("{}_{}", stem, token)),
    }
}

/// `stem` itself when no `stem` or `stem.*` file exists in `dir`, otherwise `stem_<token>`.
///
/// For tools that pick the extension themselves and only get a base name.
pub fn unique_stem(dir: &Path, stem: &str) -> String {
    let prefix = format!("{}.", stem);
    let taken = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| {
            let name = e.file_name().to_string_lossy();
            name == stem || name.starts_with(&prefix)
        });

    if taken { format!("{}_{}", stem, collision_token()) } else { stem.to_string() }
}

/// Short random suffix used to disambiguate names
fn collision_token() -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    token[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn storage(root: &Path) -> Storage {
        let storage = Storage::new(root.join("uploads"), root.join("downloads"));
        storage.ensure_layout().unwrap();
        storage
    }

    fn age(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(secs)).unwrap();
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_mluts.txt");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn test_sanitize_basename() {
        assert_eq!(sanitize_basename("  my clip.mp4 "), "my_clip");
        assert_eq!(sanitize_basename("a/b"), "a_b");
        assert_eq!(sanitize_basename(""), "video");
        assert_eq!(sanitize_basename("???"), "video");
    }

    #[test]
    fn test_layout_uses_tool_directories() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());
        assert!(root.path().join("uploads").join("video_cropper").is_dir());
        assert!(root.path().join("downloads").join("image_to_puzzle").is_dir());
        assert_eq!(
            storage.dir(Area::Downloads, ToolCategory::YtVidDownloader),
            root.path().join("downloads").join("yt_vid_downloader")
        );
    }

    #[test]
    fn test_unique_stem_ignores_extension() {
        let root = tempfile::tempdir().unwrap();
        assert_eq!(unique_stem(root.path(), "video"), "video");

        File::create(root.path().join("video.webm")).unwrap();
        File::create(root.path().join("videotape.mp4")).unwrap();
        let stem = unique_stem(root.path(), "video");
        assert!(stem.starts_with("video_"));
        assert_eq!(stem.len(), "video_".len() + 8);

        assert_eq!(unique_stem(root.path(), "tape"), "tape");
    }

    #[tokio::test]
    async fn test_collision_gets_suffix() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());

        let first = storage.save(b"one", Area::Uploads, ToolCategory::VideoCropper, "clip.mp4").await.unwrap();
        let second = storage.save(b"two", Area::Uploads, ToolCategory::VideoCropper, "clip.mp4").await.unwrap();

        assert_eq!(first.name, "clip.mp4");
        assert_ne!(second.name, "clip.mp4");
        assert!(second.name.starts_with("clip_") && second.name.ends_with(".mp4"));
        assert_eq!(second.name.len(), "clip_.mp4".len() + 8);
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_counts() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());

        let old = storage.save(b"a", Area::Downloads, ToolCategory::AudioToText, "old.txt").await.unwrap();
        let new = storage.save(b"b", Area::Downloads, ToolCategory::AudioToText, "new.txt").await.unwrap();
        age(&old.path, 3600);
        age(&new.path, 10);

        let names: Vec<_> = storage
            .list(Area::Downloads, ToolCategory::AudioToText)
            .unwrap()
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["new.txt", "old.txt"]);

        let counts = storage.counts(Area::Downloads).unwrap();
        assert_eq!(counts.len(), 11);
        assert!(counts.contains(&(ToolCategory::AudioToText, 2)));
        assert!(counts.contains(&(ToolCategory::PdfSplitter, 0)));
    }

    #[tokio::test]
    async fn test_serve_and_delete() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());
        storage.save(b"pdf", Area::Uploads, ToolCategory::PdfCombiner, "a.pdf").await.unwrap();

        assert_eq!(storage.read(Area::Uploads, ToolCategory::PdfCombiner, "a.pdf").await.unwrap(), b"pdf");
        assert!(matches!(
            storage.serve(Area::Uploads, ToolCategory::PdfCombiner, "../a.pdf"),
            Err(ConvkitError::Storage(_))
        ));
        assert!(matches!(
            storage.serve(Area::Uploads, ToolCategory::PdfCombiner, "b.pdf"),
            Err(ConvkitError::FileNotFound(_))
        ));

        assert!(storage.delete(Area::Uploads, ToolCategory::PdfCombiner, "a.pdf").await.unwrap());
        assert!(!storage.delete(Area::Uploads, ToolCategory::PdfCombiner, "a.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_import_copies_with_secure_name() {
        let root = tempfile::tempdir().unwrap();
        let storage = storage(root.path());
        let source = root.path().join("My Video.MOV");
        std::fs::write(&source, b"frames").unwrap();

        let stored = storage.import(&source, Area::Uploads, ToolCategory::VideoCropper).await.unwrap();
        assert_eq!(stored.name, "My_Video.MOV");
        assert_eq!(stored.size, 6);
        assert!(source.exists());

        let missing = storage.import(&root.path().join("nope.mp4"), Area::Uploads, ToolCategory::VideoCropper).await;
        assert!(matches!(missing, Err(ConvkitError::FileNotFound(_))));
    }

    #[test]
    fn test_category_and_area_parsing() {
        assert_eq!("video_cropper".parse::<ToolCategory>().unwrap(), ToolCategory::VideoCropper);
        assert!("nope".parse::<ToolCategory>().is_err());
        assert_eq!("Downloads".parse::<Area>().unwrap(), Area::Downloads);
    }
}
