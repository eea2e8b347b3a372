use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;

use waste_sorter::api::{build_router, AppState};
use waste_sorter::config::AppConfig;
use waste_sorter::identity::OidcGateway;
use waste_sorter::logging::init_logging;
use waste_sorter::repository::RecordStore;
use waste_sorter::service::UploadPolicy;
use waste_sorter::{Database, MaterialClassifier, StatisticsAggregator, UploadService};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to load on top of the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web service
    Serve {
        /// Address to listen on, overriding the configuration
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Classify a single image file without recording it
    Classify {
        /// Path to the image
        path: PathBuf,
    },
    /// Print statistics for a user
    Stats {
        /// External identity of the user
        #[arg(short, long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize logging; the guard flushes the file writer on exit
    let _guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(Path::new),
        config.logging.format == "json",
    )?;

    info!("Starting waste-sorter");

    match cli.command {
        Commands::Serve { bind } => serve(&config, bind).await?,
        Commands::Classify { path } => classify_file(&config, &path)?,
        Commands::Stats { user } => print_stats(&config, &user)?,
    }

    Ok(())
}

/// Run the HTTP service until interrupted
async fn serve(config: &AppConfig, bind: Option<String>) -> Result<()> {
    let db = Database::new(&config.database.path)?;
    let counts = db.store_stats()?;
    info!(
        users = counts.users,
        classifications = counts.classifications,
        stub_classifications = counts.stub_classifications,
        "Opened record store"
    );
    let store: Arc<dyn RecordStore> = Arc::new(db);

    // Loaded once and shared by every request
    let classifier = Arc::new(MaterialClassifier::load(&config.model));

    let policy = UploadPolicy {
        directory: config.upload_dir(),
        allowed_extensions: config.allowed_extensions(),
        max_bytes: config.upload.max_bytes,
    };
    let uploads = Arc::new(UploadService::new(Arc::clone(&store), classifier, policy)?);

    let public_url = config.server.public_url.trim_end_matches('/');
    let identity = Arc::new(OidcGateway::new(&config.identity, format!("{public_url}/callback"))?);

    let state = AppState::new(store, uploads, identity, &config.server.secret_key, public_url);
    let app = build_router(state);

    let address = bind.unwrap_or_else(|| config.server.bind_address.clone());
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}

/// Classify one image and print the result
fn classify_file(config: &AppConfig, path: &Path) -> Result<()> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let classifier = MaterialClassifier::load(&config.model);
    let result = classifier.classify(&bytes)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Print basic and environmental statistics for a user
fn print_stats(config: &AppConfig, external_id: &str) -> Result<()> {
    let db = Database::new(&config.database.path)?;
    let user = db
        .find_user(external_id)?
        .with_context(|| format!("No user with identity {external_id}"))?;

    let aggregator = StatisticsAggregator::new(Arc::new(db));
    let report = json!({
        "user": user.username,
        "stats": aggregator.basic_stats(user.id)?,
        "eco_stats": aggregator.eco_stats(user.id)?,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
