//! DriveGate CLI - command line front end for the Drive gateway.
//!
//! Each subcommand maps onto one gateway operation and prints its result
//! as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use drivegate_drive::{DriveConfig, DriveGateway, FolderCreation, WriterSink};

#[derive(Parser)]
#[command(name = "drivegate")]
#[command(about = "DriveGate - Drive files, folders and share links")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path to the JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List folders you own.
    Folders,

    /// List files you own.
    Files {
        /// Only list files inside this folder ID.
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Create a folder unless one with the same name exists.
    Mkdir {
        /// Folder name.
        name: String,
    },

    /// Delete a file or folder.
    Rm {
        /// Object ID.
        id: String,
    },

    /// Upload a local file into a folder.
    Upload {
        /// Local file to upload.
        path: PathBuf,

        /// Destination folder ID.
        #[arg(short, long)]
        folder: String,
    },

    /// Create a public share link.
    Share {
        /// Object ID.
        id: String,
    },

    /// Revoke the public share link.
    Unshare {
        /// Object ID.
        id: String,
    },

    /// Download an object to a local file.
    Download {
        /// Object ID.
        id: String,

        /// Display name announced for the attachment.
        #[arg(short, long)]
        name: String,

        /// Output file path.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Fetch an access token and report whether one was issued.
    Token,
}

#[derive(Serialize)]
struct DownloadSummary<'a> {
    path: &'a Path,
    bytes_written: u64,
    chunks_written: u64,
    expected_length: Option<u64>,
    content_disposition: Option<&'a str>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = resolve_config_path(cli.config)?;
    let config = DriveConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let gateway = DriveGateway::new(&config).context("Failed to create gateway")?;

    match cli.command {
        Commands::Folders => cmd_folders(&gateway).await,
        Commands::Files { folder } => cmd_files(&gateway, folder.as_deref()).await,
        Commands::Mkdir { name } => cmd_mkdir(&gateway, &name).await,
        Commands::Rm { id } => cmd_rm(&gateway, &id).await,
        Commands::Upload { path, folder } => cmd_upload(&gateway, &path, &folder).await,
        Commands::Share { id } => cmd_share(&gateway, &id).await,
        Commands::Unshare { id } => cmd_unshare(&gateway, &id).await,
        Commands::Download { id, name, out } => cmd_download(&gateway, &id, &name, &out).await,
        Commands::Token => cmd_token(&gateway).await,
    }
}

/// Use the explicit path, else `<config dir>/drivegate/config.json`.
fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let dir = dirs::config_dir().context("No config directory on this platform; pass --config")?;
    Ok(dir.join("drivegate").join("config.json"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_folders(gateway: &DriveGateway) -> Result<()> {
    let listing = gateway.list_folders().await.context("Failed to list folders")?;
    print_json(&listing)
}

async fn cmd_files(gateway: &DriveGateway, folder: Option<&str>) -> Result<()> {
    let listing = match folder {
        Some(folder_id) => gateway.list_files_by_folder(folder_id).await,
        None => gateway.list_files().await,
    }
    .context("Failed to list files")?;
    let total: u64 = listing.files.iter().filter_map(|f| f.size_bytes()).sum();
    info!("{} files, {} bytes", listing.files.len(), total);
    print_json(&listing)
}

async fn cmd_mkdir(gateway: &DriveGateway, name: &str) -> Result<()> {
    info!("Creating folder: {}", name);

    match gateway
        .create_folder(name)
        .await
        .context("Failed to create folder")?
    {
        FolderCreation::Created(folder) if folder.is_placeholder() => {
            anyhow::bail!("Folder '{}' was not created", name)
        }
        FolderCreation::Created(folder) => print_json(&folder),
        FolderCreation::Duplicate => anyhow::bail!("A folder named '{}' already exists", name),
    }
}

async fn cmd_rm(gateway: &DriveGateway, id: &str) -> Result<()> {
    let deleted = gateway.delete_object(id).await.context("Failed to delete")?;
    if !deleted {
        anyhow::bail!("Delete of {} was rejected", id);
    }
    println!("Deleted: {}", id);
    Ok(())
}

async fn cmd_upload(gateway: &DriveGateway, path: &Path, folder: &str) -> Result<()> {
    info!("Uploading {} to folder {}", path.display(), folder);

    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("Upload path has no usable file name")?;
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let object = gateway
        .create_file(file, name, folder)
        .await
        .context("Upload failed")?;
    if object.is_placeholder() {
        anyhow::bail!("Upload of {} did not complete", path.display());
    }
    print_json(&object)
}

async fn cmd_share(gateway: &DriveGateway, id: &str) -> Result<()> {
    let link = gateway
        .create_share_link(id)
        .await
        .context("Failed to create share link")?;
    match link.web_view_link.as_deref().filter(|l| !l.is_empty()) {
        Some(url) => {
            println!("{}", url);
            Ok(())
        }
        None => anyhow::bail!("No share link returned for {}", id),
    }
}

async fn cmd_unshare(gateway: &DriveGateway, id: &str) -> Result<()> {
    gateway
        .revoke_share_link(id)
        .await
        .context("Failed to revoke share link")?;
    println!("Share link revoked: {}", id);
    Ok(())
}

async fn cmd_download(gateway: &DriveGateway, id: &str, name: &str, out: &Path) -> Result<()> {
    info!("Downloading {} to {}", id, out.display());

    let file = tokio::fs::File::create(out)
        .await
        .with_context(|| format!("Failed to create {}", out.display()))?;
    let mut sink = WriterSink::new(file);

    let report = gateway
        .stream_download(id, name, &mut sink)
        .await
        .context("Download failed")?;

    print_json(&DownloadSummary {
        path: out,
        bytes_written: report.bytes_written,
        chunks_written: report.chunks_written,
        expected_length: report.expected_length,
        content_disposition: sink.headers().map(|h| h.content_disposition.as_str()),
    })
}

async fn cmd_token(gateway: &DriveGateway) -> Result<()> {
    let token = gateway.access_token().await;
    if token.secret().is_empty() {
        anyhow::bail!("Token endpoint did not issue an access token");
    }
    println!("Access token issued ({} chars)", token.secret().len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_config_path_wins() {
        let path = resolve_config_path(Some(PathBuf::from("/tmp/custom.json"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn test_cli_parses_download() {
        let cli = Cli::try_parse_from([
            "drivegate", "download", "abc", "--name", "a.txt", "--out", "/tmp/a.txt",
        ])
        .unwrap();

        match cli.command {
            Commands::Download { id, name, out } => {
                assert_eq!(id, "abc");
                assert_eq!(name, "a.txt");
                assert_eq!(out, PathBuf::from("/tmp/a.txt"));
            }
            _ => panic!("expected download command"),
        }
    }

    #[test]
    fn test_cli_files_folder_flag() {
        let cli = Cli::try_parse_from(["drivegate", "files", "--folder", "f1"]).unwrap();
        assert!(matches!(cli.command, Commands::Files { folder: Some(ref f) } if f == "f1"));
    }
}
