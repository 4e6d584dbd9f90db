use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rescue_core::capture::{capture_incident, submit_report};
use rescue_core::collab::AuthProvider;
use rescue_core::config::{Config, DEFAULT_CONFIG_FILE};
use rescue_core::db::SqliteReports;
use rescue_core::fetch::{FeedController, RefreshOutcome};
use rescue_core::media::DirStorage;
use rescue_core::ReportStore;
use schemars::schema_for;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod devices;

use devices::{ArgsLocator, EnvAuth, FileCamera, USER_ENV};

#[derive(Parser)]
#[command(name = "petsos")]
#[command(about = "PetSOS community animal rescue reporter", long_about = None)]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report an incident from a photo
    Report {
        /// Image file of the incident
        #[arg(long)]
        photo: PathBuf,
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Place name to tag instead of reverse geocoding
        #[arg(long)]
        address: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Show the community feed
    Feed {
        /// Also write the feed as markdown notes into this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Export canonical JSON Schemas to the ./schemas directory
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Export JSON Schema files for canonical types
    Export {
        /// Output directory (default: ./schemas)
        #[arg(long, default_value = "schemas")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "petsos=info,rescue_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            photo,
            lat,
            lng,
            address,
            description,
        } => {
            let config = Config::load(&cli.config)?;
            let locator = ArgsLocator::new(lat, lng, address);
            report(&config, photo, locator, &description).await
        }
        Commands::Feed { export } => {
            let config = Config::load(&cli.config)?;
            show_feed(&config, export).await
        }
        Commands::Schema { command } => match command {
            SchemaCommands::Export { out_dir } => schema_export(out_dir),
        },
    }
}

async fn report(config: &Config, photo: PathBuf, locator: ArgsLocator, description: &str) -> Result<()> {
    let auth = EnvAuth::from_env();
    auth.on_session_change(Box::new(|session| {
        tracing::info!(signed_in = session.is_some(), "Session changed");
    }));
    let Some(session) = auth.session().await else {
        bail!("Sign in first: set {USER_ENV} to your username");
    };
    tracing::info!(user = %session.user_id, "Reporting incident");

    let db = open_db(config)?;
    let storage = DirStorage::new(&config.media_root, &config.bucket, &config.public_base_url);
    let store = ReportStore::new();
    let controller = FeedController::new(&store, &db, config);
    log_refresh(controller.on_focus().await);

    let camera = FileCamera::new(photo);
    let incident = capture_incident(&camera, &locator)
        .await
        .context("Could not take photo")?;

    let submitted = submit_report(&store, &camera, &storage, &db, &incident, description, config).await;
    log_refresh(controller.refresh().await);
    print_feed(&store);

    match submitted {
        Ok(id) => {
            tracing::info!(%id, "Report submitted");
            Ok(())
        }
        Err(e) => Err(anyhow::Error::new(e).context("Upload failed")),
    }
}

async fn show_feed(config: &Config, export: Option<PathBuf>) -> Result<()> {
    let db = open_db(config)?;
    let store = ReportStore::new();
    let controller = FeedController::new(&store, &db, config);

    if let RefreshOutcome::Failed = controller.on_focus().await {
        eprintln!("Could not refresh the feed; showing the last known list.");
    }
    print_feed(&store);

    if let Some(dir) = export {
        feed::export_feed(&store.reports(), &dir, feed::display_offset())?;
        println!("Exported feed to {}", dir.display());
    }
    Ok(())
}

fn open_db(config: &Config) -> Result<SqliteReports> {
    if let Some(parent) = config.database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    SqliteReports::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path.display()))
}

fn log_refresh(outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Applied { count } => tracing::debug!(count, "Feed refreshed"),
        other => tracing::info!(outcome = ?other, "Feed not refreshed"),
    }
}

fn print_feed(store: &ReportStore) {
    let rendered = feed::render_feed(&store.reports(), &store.counts(), feed::display_offset());
    println!("{rendered}");
}

fn schema_export(out_dir: PathBuf) -> Result<()> {
    fs::create_dir_all(&out_dir)?;

    let report_schema = schema_for!(rescue_core::schema::Report);
    let report_json = serde_json::to_string_pretty(&report_schema)?;
    fs::write(out_dir.join("Report.schema.json"), report_json)?;

    let row_schema = schema_for!(rescue_core::schema::RemoteRow);
    let row_json = serde_json::to_string_pretty(&row_schema)?;
    fs::write(out_dir.join("RemoteRow.schema.json"), row_json)?;

    println!("Exported schemas to {}", out_dir.display());
    Ok(())
}
