use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, ConvkitError};

// Default values for fetch settings missing from older config files
fn default_retries() -> u32 {
    10
}

fn default_socket_timeout() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub media: MediaConfig,
    pub fetch: FetchConfig,
    pub transcriber: TranscriberConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory holding one upload subdirectory per tool
    pub uploads_dir: PathBuf,
    /// Root directory holding one download subdirectory per tool
    pub downloads_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_path: String,
    /// Video encoder used when re-encoding through a filter graph
    pub video_codec: String,
    /// Audio encoder used when re-encoding through a filter graph
    pub audio_codec: String,
    /// x264 preset (ultrafast, veryfast, medium, slow, ...)
    pub preset: String,
    /// Constant rate factor (0-51, lower = better quality)
    pub crf: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Path to yt-dlp binary
    pub binary_path: String,
    /// Netscape cookie file handed to cookie-eligible client profiles
    pub cookie_file: PathBuf,
    /// Per-request retries performed inside the downloader itself
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Per-fragment retries performed inside the downloader itself
    #[serde(default = "default_retries")]
    pub fragment_retries: u32,
    /// Socket timeout in seconds
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to the whisper command line tool
    pub binary_path: String,
    /// Default model size (tiny, base, small, medium, large)
    pub model: String,
    /// Device passed to whisper (cpu, cuda)
    pub device: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                uploads_dir: PathBuf::from("uploads"),
                downloads_dir: PathBuf::from("downloads"),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                probe_path: "ffprobe".to_string(),
                video_codec: "libx264".to_string(),
                audio_codec: "aac".to_string(),
                preset: "veryfast".to_string(),
                crf: 20,
            },
            fetch: FetchConfig {
                binary_path: "yt-dlp".to_string(),
                cookie_file: PathBuf::from("/tmp/youtube_cookies.txt"),
                retries: default_retries(),
                fragment_retries: default_retries(),
                socket_timeout: default_socket_timeout(),
            },
            transcriber: TranscriberConfig {
                binary_path: "whisper".to_string(),
                model: "small".to_string(),
                device: "cpu".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvkitError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| ConvkitError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConvkitError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConvkitError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Write the default configuration, leaving an existing file alone unless `force` is set
    pub fn write_default<P: AsRef<Path>>(path: P, force: bool) -> Result<()> {
        let path = path.as_ref();
        if path.exists() && !force {
            return Err(ConvkitError::Config(format!(
                "{} already exists, pass --force to overwrite",
                path.display()
            )));
        }
        Config::default().save_to_file(path)
    }

    /// Point the fetch engine at an externally provided cookie file
    pub fn with_cookie_file(mut self, cookie_file: Option<PathBuf>) -> Self {
        if let Some(path) = cookie_file {
            self.fetch.cookie_file = path;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrips_through_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convkit.toml");

        let mut config = Config::default();
        config.media.crf = 23;
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.media.crf, 23);
        assert_eq!(loaded.fetch.binary_path, "yt-dlp");
    }

    #[test]
    fn test_write_default_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convkit.toml");

        Config::write_default(&path, false).unwrap();
        let written = Config::from_file(&path).unwrap();
        assert_eq!(written.transcriber.model, "small");

        std::fs::write(&path, "custom").unwrap();
        assert!(matches!(Config::write_default(&path, false), Err(ConvkitError::Config(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "custom");

        Config::write_default(&path, true).unwrap();
        assert_eq!(Config::from_file(&path).unwrap().media.crf, 20);
    }

    #[test]
    fn test_missing_fetch_tuning_uses_defaults() {
        let content = r#"
[storage]
uploads_dir = "up"
downloads_dir = "down"

[media]
binary_path = "ffmpeg"
probe_path = "ffprobe"
video_codec = "libx264"
audio_codec = "aac"
preset = "veryfast"
crf = 20

[fetch]
binary_path = "yt-dlp"
cookie_file = "/tmp/cookies.txt"

[transcriber]
binary_path = "whisper"
model = "base"
device = "cpu"
"#;
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.fetch.retries, 10);
        assert_eq!(config.fetch.socket_timeout, 30);
        assert_eq!(config.storage.uploads_dir, PathBuf::from("up"));
    }

    #[test]
    fn test_cookie_override() {
        let config = Config::default().with_cookie_file(Some(PathBuf::from("/srv/cookies.txt")));
        assert_eq!(config.fetch.cookie_file, PathBuf::from("/srv/cookies.txt"));

        let config = Config::default().with_cookie_file(None);
        assert_eq!(config.fetch.cookie_file, PathBuf::from("/tmp/youtube_cookies.txt"));
    }
}
