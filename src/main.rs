use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use chemdata::config::Config;
use chemdata::domain::AuthenticatedUser;
use chemdata::identity::StaticTokenIdentity;
use chemdata::logging;
use chemdata::pipeline::IngestPipeline;
use chemdata::server::{run_server, AppState};
use chemdata::storage::{DatasetStore, SqliteStore};

#[derive(Parser)]
#[command(name = "chemdata")]
#[command(about = "Shared chemical-measurement dataset service")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP upload/listing server
    Serve {
        /// Listen address, overrides the configured one
        #[arg(long)]
        addr: Option<String>,
    },
    /// Ingest a local file directly (development/operations surface)
    Ingest {
        /// Tabular file to ingest (.csv, .tsv, .xlsx, .xls)
        #[arg(long)]
        file: PathBuf,
        /// Username to stamp rows with
        #[arg(long)]
        user: String,
    },
    /// Print a page of the dataset plus the upload history
    Show {
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        per_page: Option<usize>,
    },
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DatasetStore>> {
    Ok(Arc::new(SqliteStore::open(&config.database_path)?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_from(&cli.config)?;

    match cli.command {
        Commands::Serve { addr } => {
            let store = open_store(&config)?;
            let state = Arc::new(AppState {
                pipeline: IngestPipeline::new(store),
                identity: Arc::new(StaticTokenIdentity::from_entries(&config.users)),
                page_size: config.page_size,
            });
            let addr = addr.unwrap_or(config.listen_addr).parse()?;
            run_server(state, addr).await?;
        }
        Commands::Ingest { file, user } => {
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("invalid file name: {}", file.display()))?
                .to_string();
            let bytes = std::fs::read(&file)?;

            let uploader = AuthenticatedUser {
                id: Uuid::new_v4(),
                username: user,
                is_admin: false,
                is_approved: true,
            };

            let pipeline = IngestPipeline::new(open_store(&config)?);
            match pipeline.ingest(&filename, &bytes, &uploader).await {
                Ok(report) => {
                    println!("\n📊 Ingestion results for {}:", filename);
                    if report.created {
                        println!("   Dataset created");
                    }
                    println!("   Inserted:   {}", report.inserted);
                    println!("   Duplicates: {}", report.duplicates);
                    println!("   Dropped:    {}", report.dropped);
                }
                Err(e) => {
                    error!("Ingestion failed: {}", e);
                    println!("❌ Ingestion failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Show { page, per_page } => {
            let store = open_store(&config)?;
            let per_page = per_page.unwrap_or(config.page_size).max(1);
            let page = page.max(1);

            let rows = store.read_all().await?;
            let total = rows.len();
            println!("📄 Page {} ({} row(s) total):", page, total);
            for record in rows.iter().skip((page - 1).saturating_mul(per_page)).take(per_page) {
                println!(
                    "   {} | {} | {} | {} | uploaded by {}",
                    record.species, record.chemical, record.amount, record.doi, record.uploaded_by
                );
            }

            let audits = store.audits().await?;
            println!("\n🧾 Upload history ({} entr{}):", audits.len(), if audits.len() == 1 { "y" } else { "ies" });
            for audit in audits {
                println!("   {} | {} | {}", audit.uploaded_at, audit.filename, audit.user_id);
            }
        }
    }

    Ok(())
}
