//! convkit - file conversion toolbox
//!
//! Command line entry point: fetches remote media, removes segments from videos,
//! transcribes recordings and manages the per-tool file storage.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use convkit::cli::{Args, Commands, FilesAction};
use convkit::config::Config;
use convkit::fetch::{CookieJar, MediaKind};
use convkit::storage::{Area, StoredArtifact, ToolCategory};
use convkit::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    if let Commands::InitConfig { path, force } = &args.command {
        Config::write_default(path, *force)?;
        println!("Configuration written to {}", path.display());
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    bootstrap_cookies(&config);

    let workflow = Workflow::new(config.clone())?;

    match args.command {
        Commands::Fetch { url, format, name, no_cookies } => {
            let kind: MediaKind = format.parse()?;
            let pb = spinner(&format!("Downloading {} as {}", url, kind));
            let result = workflow.fetch_media(&url, kind, name.as_deref(), !no_cookies).await;
            pb.finish_and_clear();

            print_artifact("Downloaded", &result?);
        }
        Commands::Crop { input, start, end, name } => {
            let pb = spinner(&format!("Removing {}-{} from {}", start, end, input.display()));
            let result = workflow.crop_video(&input, &start, &end, name.as_deref()).await;
            pb.finish_and_clear();

            print_artifact("Cropped video", &result?);
        }
        Commands::Probe { input } => {
            let report = workflow.probe_media(&input).await?;
            println!("File:     {}", input.display());
            println!("Duration: {:.3}s ({})", report.duration, format_duration(report.duration as u64));
            println!(
                "Streams:  {} video, {} audio, {} other",
                report.streams.video, report.streams.audio, report.streams.other
            );
        }
        Commands::Transcribe { input, model, translate, name } => {
            let model = model.unwrap_or_else(|| config.transcriber.model.clone());
            let pb = spinner(&format!("Transcribing {} with model {}", input.display(), model));
            let result = workflow.transcribe_media(&input, &model, translate, name.as_deref()).await;
            pb.finish_and_clear();

            let output = result?;
            println!(
                "Language: {} ({} lines)",
                output.language.as_deref().unwrap_or("auto"),
                output.lines
            );
            print_artifact("Transcript", &output.transcript);
            print_artifact("Subtitles", &output.subtitles);
        }
        Commands::Files { action } => {
            run_files_action(&workflow, action).await?;
        }
        Commands::Check => {
            let checks = workflow.check_tools().await;
            println!("{:<10} {:<12} {}", "Tool", "Status", "Detail");
            println!("{}", "-".repeat(60));
            for check in &checks {
                let status = if check.available { "available" } else { "missing" };
                let detail = check.detail.lines().next().unwrap_or_default();
                println!("{:<10} {:<12} {}", check.name, status, detail);
            }

            if checks.iter().any(|c| !c.available) {
                warn!("Some external tools are not available");
            }
        }
        Commands::Cookies => {
            let status = workflow.cookie_status();
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::InitConfig { .. } => {}
    }

    Ok(())
}

async fn run_files_action(workflow: &Workflow, action: FilesAction) -> Result<()> {
    let storage = workflow.storage();

    match action {
        FilesAction::List { area, tool } => {
            let area: Area = area.parse()?;
            let categories = match tool {
                Some(tool) => vec![tool.parse::<ToolCategory>()?],
                None => ToolCategory::ALL.to_vec(),
            };

            for category in categories {
                let files = storage.list(area, category)?;
                if files.is_empty() {
                    continue;
                }

                println!("\n{}/{} ({} files):", area, category, files.len());
                println!("{:<50} {:<20} {:>12}", "Name", "Modified", "Size");
                println!("{}", "-".repeat(84));
                for file in files {
                    println!(
                        "{:<50} {:<20} {:>12}",
                        file.name,
                        file.modified.format("%Y-%m-%d %H:%M:%S").to_string(),
                        format_size(file.size)
                    );
                }
            }

            let total: usize = storage.counts(area)?.iter().map(|(_, count)| count).sum();
            println!("\nTotal files in {}: {}", area, total);
        }
        FilesAction::Export { area, tool, name, dest } => {
            let area: Area = area.parse()?;
            let category: ToolCategory = tool.parse()?;
            let source = storage.serve(area, category, &name)?;

            let dest = export_destination(&dest, &name);
            tokio::fs::copy(&source, &dest).await?;
            info!("Exported {} to {}", source.display(), dest.display());
            println!("Exported: {}", dest.display());
        }
        FilesAction::Delete { area, tool, name } => {
            let area: Area = area.parse()?;
            let category: ToolCategory = tool.parse()?;

            if storage.delete(area, category, &name).await? {
                println!("Deleted: {}/{}/{}", area, category, name);
            } else {
                println!("File not found: {}/{}/{}", area, category, name);
            }
        }
    }

    Ok(())
}

/// Explicit config file, else `./convkit.toml`, else defaults; cookie path from the environment wins
fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("convkit.toml").exists() {
                info!("Found convkit.toml in current directory, loading...");
                Config::from_file("convkit.toml")?
            } else {
                Config::default()
            }
        }
    };

    let cookie_file = std::env::var_os("YT_COOKIES_PATH").map(PathBuf::from);
    Ok(config.with_cookie_file(cookie_file))
}

fn bootstrap_cookies(config: &Config) {
    let Ok(payload) = std::env::var("YT_COOKIES_B64") else {
        return;
    };

    let jar = CookieJar::new(config.fetch.cookie_file.clone());
    match jar.bootstrap_from_base64(&payload) {
        Ok(true) => info!("Cookie bundle written to {}", jar.path().display()),
        Ok(false) => debug!("Cookie bundle already present at {}", jar.path().display()),
        Err(e) => warn!("Could not write cookie bundle: {}", e),
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".convkit").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "convkit.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("convkit.log").display());

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_artifact(label: &str, artifact: &StoredArtifact) {
    println!("{}: {} ({})", label, artifact.path.display(), format_size(artifact.size));
}

/// A directory destination keeps the stored name
fn export_destination(dest: &Path, name: &str) -> PathBuf {
    if dest.is_dir() { dest.join(name) } else { dest.to_path_buf() }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{} B", bytes) } else { format!("{:.1} {}", size, UNITS[unit]) }
}
