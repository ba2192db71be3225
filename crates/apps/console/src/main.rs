use std::env;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use formats::{FileDescriptor, format_file_size};
use layers::Basemap;
use protocol::PROCESS_QUERY_PATH;
use serde_json::json;
use session::{MapSession, SessionConfig, SessionError};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod app;
mod transport;

use app::App;
use transport::Endpoints;

const DEFAULT_UPLOAD_URL: &str = "http://127.0.0.1:8000/upload/";
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(author, version, about = "Shapefile upload and GeoAI command client")]
struct Args {
    /// Shapefile converter endpoint (env: SHAPEMAP_UPLOAD_URL)
    #[arg(long)]
    upload_url: Option<String>,

    /// Assistant API base; `/process-gis-query` is appended (env: SHAPEMAP_API_BASE_URL)
    #[arg(long)]
    api_base_url: Option<String>,

    /// Send commands to the older `{command}` endpoint instead (env: SHAPEMAP_LEGACY_COMMAND_URL)
    #[arg(long)]
    legacy_command_url: Option<String>,

    /// Status message lifetime in milliseconds (env: SHAPEMAP_STATUS_MS)
    #[arg(long)]
    status_ms: Option<u64>,

    /// Basemap reported with the output
    #[arg(long, default_value = "osm")]
    basemap: Basemap,

    /// Keep running until the last status message has expired
    #[arg(long)]
    wait_status: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the given files form a complete shapefile bundle
    Validate { files: Vec<PathBuf> },

    /// Upload a bundle and show the resulting layer
    Upload {
        files: Vec<PathBuf>,

        /// Layer color, one of the upload palette presets
        #[arg(long)]
        color: Option<String>,
    },

    /// Ask the assistant, optionally after uploading a bundle for context
    Ask {
        query: String,

        #[arg(long, num_args = 1..)]
        files: Vec<PathBuf>,
    },
}

fn main() {
    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let endpoints = resolve_endpoints(&args);
    let status_ms = match args.status_ms {
        Some(ms) => ms,
        None => env::var("SHAPEMAP_STATUS_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()?,
    };
    let config = SessionConfig {
        status_delay: Duration::from_millis(status_ms),
        ..SessionConfig::default()
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut session = MapSession::new(config);
    session.set_basemap(args.basemap);
    let mut app = App::new(session, endpoints, args.wait_status);

    match args.command {
        Command::Validate { files } => return cmd_validate(&mut app, &files),
        Command::Upload { files, color } => {
            if let Some(color) = color {
                app.session_mut().set_upload_color(&color)?;
            }
            runtime.block_on(upload(&mut app, &files))?;
        }
        Command::Ask { query, files } => {
            runtime.block_on(async {
                if !files.is_empty() {
                    upload(&mut app, &files).await?;
                }
                app.start_command(&query)?;
                app.run_until_idle().await;
                Ok::<_, Box<dyn std::error::Error>>(())
            })?;
        }
    }

    println!("{}", serde_json::to_string_pretty(&app.report())?);
    Ok(())
}

fn resolve_endpoints(args: &Args) -> Endpoints {
    let upload_url = args.upload_url.clone().unwrap_or_else(|| {
        env::var("SHAPEMAP_UPLOAD_URL").unwrap_or_else(|_| DEFAULT_UPLOAD_URL.to_string())
    });
    let api_base = args.api_base_url.clone().unwrap_or_else(|| {
        env::var("SHAPEMAP_API_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
    });
    let legacy_command_url = args
        .legacy_command_url
        .clone()
        .or_else(|| env::var("SHAPEMAP_LEGACY_COMMAND_URL").ok())
        .filter(|u| !u.is_empty());
    Endpoints {
        upload_url,
        command_url: format!("{}{PROCESS_QUERY_PATH}", api_base.trim_end_matches('/')),
        legacy_command_url,
    }
}

fn describe(paths: &[PathBuf]) -> Result<Vec<FileDescriptor>, std::io::Error> {
    paths.iter().map(FileDescriptor::from_path).collect()
}

fn cmd_validate(app: &mut App, paths: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let files = describe(paths)?;
    let v = app.session_mut().select_files(&files);
    let accepted: Vec<_> = v
        .accepted
        .iter()
        .map(|f| json!({"name": f.name, "size": format_file_size(f.size_bytes)}))
        .collect();
    let report = json!({
        "accepted": accepted,
        "missing": v.missing_display(),
        "complete": v.is_complete(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !v.is_complete() {
        let missing = v.missing.iter().copied().collect();
        return Err(Box::new(SessionError::Validation { missing }));
    }
    Ok(())
}

async fn upload(app: &mut App, paths: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    let files = describe(paths)?;
    app.session_mut().select_files(&files);
    app.start_upload()?;
    app.run_until_idle().await;
    if let Some(status) = app.session().status() {
        info!("{}", status.text);
    }
    Ok(())
}
