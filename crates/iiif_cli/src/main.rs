//! Command-line entry point for loading and inspecting a federated corpus.
//!
//! # Responsibility
//! - Configure each backend from flags or `IIIF_*` environment variables.
//! - Run uploads and print a deterministic federated summary.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use iiif_core::{
    AnnotationProcessor, CollectionProcessor, GenericQueryProcessor, MetadataProcessor,
    Processor, RelationalQueryProcessor, TriplestoreQueryProcessor, UploadHandler,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "iiif_cli")]
#[command(about = "Federated IIIF corpus over SQLite and a SPARQL endpoint")]
struct Cli {
    /// SQLite database holding annotations, images and metadata
    #[arg(long, env = "IIIF_RELATIONAL_DB", default_value = "relational.db")]
    relational_db: String,

    /// SPARQL 1.1 endpoint holding the collection hierarchy
    #[arg(
        long,
        env = "IIIF_SPARQL_ENDPOINT",
        default_value = "http://127.0.0.1:9999/blazegraph/sparql"
    )]
    sparql_endpoint: String,

    /// trace|debug|info|warn|error; defaults to the build-mode level
    #[arg(long, env = "IIIF_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; no file log when unset
    #[arg(long, env = "IIIF_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print core linkage and version
    Ping,

    /// Load an annotation CSV (id,body,target,motivation)
    LoadAnnotations { path: PathBuf },

    /// Load a metadata CSV (id,title,creator)
    LoadMetadata { path: PathBuf },

    /// Load a IIIF collection or manifest JSON document
    LoadCollection { path: PathBuf },

    /// Print federated entity counts
    Summary,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli
            .log_level
            .clone()
            .unwrap_or_else(|| iiif_core::default_log_level().to_string());
        iiif_core::init_logging(&level, log_dir)
            .map_err(|err| anyhow!("logging setup failed: {err}"))?;
    }

    match &cli.command {
        Command::Ping => {
            println!("iiif_core ping={}", iiif_core::ping());
            println!("iiif_core version={}", iiif_core::core_version());
            Ok(())
        }
        Command::LoadAnnotations { path } => {
            upload(AnnotationProcessor::new(), &cli.relational_db, path)
        }
        Command::LoadMetadata { path } => {
            upload(MetadataProcessor::new(), &cli.relational_db, path)
        }
        Command::LoadCollection { path } => {
            upload(CollectionProcessor::new(), &cli.sparql_endpoint, path)
        }
        Command::Summary => summary(&cli),
    }
}

fn upload(mut handler: impl UploadHandler, location: &str, path: &Path) -> Result<()> {
    if !handler.set_db_path_or_url(location) {
        bail!("invalid {} location `{location}`", handler.handler_name());
    }
    let records = handler
        .try_upload_data(path)
        .with_context(|| format!("upload of `{}` failed", path.display()))?;
    println!("{} records={records}", handler.handler_name());
    Ok(())
}

fn summary(cli: &Cli) -> Result<()> {
    let mut relational = RelationalQueryProcessor::new();
    if !relational.set_db_path_or_url(&cli.relational_db) {
        bail!("invalid relational database path `{}`", cli.relational_db);
    }
    let mut triplestore = TriplestoreQueryProcessor::new();
    if !triplestore.set_db_path_or_url(&cli.sparql_endpoint) {
        bail!("invalid sparql endpoint `{}`", cli.sparql_endpoint);
    }

    let mut federation = GenericQueryProcessor::new();
    federation.add_query_processor(relational);
    federation.add_query_processor(triplestore);
    log::info!(
        "event=cli_summary module=cli status=start backends={}",
        federation.query_processor_count()
    );

    println!("collections={}", federation.get_all_collections()?.len());
    println!("manifests={}", federation.get_all_manifests()?.len());
    println!("canvases={}", federation.get_all_canvas()?.len());
    println!("annotations={}", federation.get_all_annotations()?.len());
    println!("images={}", federation.get_all_images()?.len());
    Ok(())
}
