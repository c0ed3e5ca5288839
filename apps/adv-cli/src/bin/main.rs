#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

use std::io::Write;
use std::path::{Path, PathBuf};

use adv_client::{AdvClient, EmbeddingsApi};
use adv_core::config::{ClientSettings, Config};
use adv_core::progress::UploadProgress;
use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "advtool", about = "Manage embedding types and import feature vectors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Overrides RUST_LOG;
    /// without either, warn.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// API key. Takes priority over LABELBOX_API_KEY and LABELBOX_API_KEY_FILE.
    #[arg(long, global = true)]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Embeddings commands.
    Embeddings {
        #[command(subcommand)]
        action: EmbeddingsAction,
    },
}

#[derive(Subcommand)]
enum EmbeddingsAction {
    /// List embedding types.
    List,
    /// Create an embedding type.
    Create {
        /// A unique name for the embedding type.
        #[arg(value_name = "NAME")]
        name: String,
        /// The number of dimensions this embedding has.
        #[arg(value_name = "DIMENSIONS")]
        dims: u32,
    },
    /// Import feature vectors from an NDJSON file.
    Import {
        /// The ID of the embedding type.
        #[arg(value_name = "ID")]
        id: String,
        /// The path to the NDJSON file.
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// Get the imported vector count.
    Count {
        /// The ID of the embedding type.
        #[arg(value_name = "ID")]
        id: String,
    },
}

/// The `--log-level` flag wins, then RUST_LOG, then `warn`.
fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}

fn init_tracing(level: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(api_key: Option<String>) -> adv_core::Result<AdvClient> {
    let config = Config::load()?;
    let settings = ClientSettings::resolve(&config, api_key)?;
    debug!(?settings, "client settings resolved");
    AdvClient::new(settings)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let client = match build_client(cli.api_key) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Unable to init client, {}", e);
            std::process::exit(1);
        }
    };
    let api = EmbeddingsApi::new(&client);

    match cli.command {
        Commands::Embeddings { action } => match action {
            EmbeddingsAction::List => {
                for item in api.list_embedding_types()? {
                    println!("{} - {}", item.id, item.name);
                }
            }
            EmbeddingsAction::Create { name, dims } => {
                let created = api.create_embedding_type(&name, dims)?;
                println!("Embedding type created id={}", created.id);
            }
            EmbeddingsAction::Import { id, path } => import(&api, &id, &path)?,
            EmbeddingsAction::Count { id } => {
                println!("{}", api.imported_vector_count(&id)?);
            }
        },
    }
    Ok(())
}

fn import(api: &EmbeddingsApi<'_>, id: &str, path: &Path) -> anyhow::Result<()> {
    let mut progress = UploadProgress::for_file(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    println!("Uploading file: {}", path.display());

    let pb = ProgressBar::new(progress.total_bytes());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("#>-"),
    );
    let mut on_batch = |rsp: &Value| -> adv_core::Result<()> {
        progress.record(rsp)?;
        report_progress(&pb, &progress, &mut std::io::stdout())?;
        Ok(())
    };

    match api.import_vectors_from_file(id, path, Some(&mut on_batch)) {
        Ok(summary) => {
            pb.finish();
            debug!(batches = summary.batches, lines = summary.lines, "upload complete");
        }
        Err(e) => {
            pb.abandon();
            return Err(e).with_context(|| format!("Import of {} into {} failed", path.display(), id));
        }
    }
    println!("Check 'advtool embeddings count {}' for total searchable embeddings", id);
    Ok(())
}

/// Advance the bar. A hidden bar (stderr is not a terminal) draws nothing,
/// so the percentage goes to `out` as a plain line instead.
fn report_progress(pb: &ProgressBar, progress: &UploadProgress, out: &mut dyn Write) -> std::io::Result<()> {
    let line = format!("Progress: {}%", progress.percent());
    pb.set_position(progress.uploaded_bytes());
    if pb.is_hidden() {
        writeln!(out, "{}", line)?;
    }
    pb.set_message(line);
    Ok(())
}
