use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvkitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Media probe error: {0}")]
    Probe(String),

    #[error("Transcode failed: {0}")]
    Transcode(String),

    #[error("Download failed after retries. Last error: {0}")]
    FetchExhausted(String),

    #[error("Finished, but could not locate the output file for '{0}'")]
    ArtifactNotFound(String),

    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Invalid time format: {0}")]
    InvalidTimecode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Transcriber error: {0}")]
    Transcriber(String),

    #[error("No speech detected")]
    NoSpeech,

    #[error("Credential bundle error: {0}")]
    Credentials(String),

    #[error("PDF rendering error: {0}")]
    Pdf(String),
}

pub type Result<T> = std::result::Result<T, ConvkitError>;
