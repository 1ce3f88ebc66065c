use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a remote video (mp4) or its audio track (mp3)
    Fetch {
        /// Video page URL
        url: String,

        /// Output format: mp4 or mp3
        #[arg(short, long, default_value = "mp4")]
        format: String,

        /// Output file name (extension is ignored)
        #[arg(short, long)]
        name: Option<String>,

        /// Never pass the cookie bundle to the downloader
        #[arg(long)]
        no_cookies: bool,
    },

    /// Remove a time range from a video
    Crop {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Range start (SS, MM:SS or HH:MM:SS)
        #[arg(short, long)]
        start: String,

        /// Range end (SS, MM:SS or HH:MM:SS)
        #[arg(short, long)]
        end: String,

        /// Output file name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Show duration and stream layout of a media file
    Probe {
        /// Input media file
        input: PathBuf,
    },

    /// Write a second-by-second transcript and subtitles for a media file
    Transcribe {
        /// Input audio or video file
        #[arg(short, long)]
        input: PathBuf,

        /// Model size (tiny, base, small, medium, large)
        #[arg(short, long)]
        model: Option<String>,

        /// Translate speech to English instead of transcribing
        #[arg(long)]
        translate: bool,

        /// Output file name (extension is ignored)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Manage stored uploads and downloads
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },

    /// Check availability of the external tools
    Check,

    /// Show the cookie bundle status
    Cookies,

    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination file
        #[arg(default_value = "convkit.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum FilesAction {
    /// List stored files, newest first
    List {
        /// Storage area: uploads or downloads
        #[arg(short, long, default_value = "downloads")]
        area: String,

        /// Restrict the listing to one tool
        #[arg(short, long)]
        tool: Option<String>,
    },

    /// Copy a stored file out of the storage layout
    Export {
        /// Storage area: uploads or downloads
        #[arg(short, long, default_value = "downloads")]
        area: String,

        /// Tool the file belongs to
        #[arg(short, long)]
        tool: String,

        /// Stored file name
        name: String,

        /// Destination path
        #[arg(short, long)]
        dest: PathBuf,
    },

    /// Delete a stored file
    Delete {
        /// Storage area: uploads or downloads
        #[arg(short, long, default_value = "downloads")]
        area: String,

        /// Tool the file belongs to
        #[arg(short, long)]
        tool: String,

        /// Stored file name
        name: String,
    },
}
