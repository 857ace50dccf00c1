use clap::{Parser, Subcommand};
use tracing::info;

use cal_core::storage::{DatabaseStorage, Storage};
use cal_core::DatabaseManager;
use cal_loader::candidacies::CandidacyLoader;
use cal_loader::observability::logging::init_logging;
use cal_loader::schedule_g::ScheduleGLoader;
use cal_loader::seed::seed_parties;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "cal-loader")]
#[command(about = "Load CAL-ACCESS filings into the normalized OCD schema")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the canonical parties (including the UNKNOWN sentinel) exist
    Seed,
    /// Load OCD candidacies from unlinked Form 501 filings
    LoadCandidacies,
    /// Load Form 460 Schedule G items from raw expenditure rows
    LoadScheduleG,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    init_logging();

    // Initialize database storage
    info!("Initializing database storage...");
    let db_manager = DatabaseManager::new().await?;
    db_manager.run_migrations().await?;
    let storage: Arc<dyn Storage> = Arc::new(DatabaseStorage::new(db_manager).await?);
    info!("Database storage initialized successfully");

    match cli.command {
        Commands::Seed => {
            let created = seed_parties(storage).await?;
            println!("Seeded {created} parties");
        }
        Commands::LoadCandidacies => {
            println!("Loading candidacies from Form 501 filings");
            let loader = CandidacyLoader::new(storage);
            let outcome = loader.run().await?;
            println!(
                "Processed {} filings ({} candidacies created, {} updated)",
                outcome.processed, outcome.created, outcome.updated
            );
            if outcome.halted {
                println!("Pass halted early: a filing had no matching contest (load contests first)");
            } else {
                println!("Done!");
            }
        }
        Commands::LoadScheduleG => {
            println!("Loading Form 460 Schedule G items");
            let loader = ScheduleGLoader::new(storage);
            let outcome = loader.run().await?;
            println!(
                "Loaded {} items across {} filings ({} version rows)",
                outcome.items, outcome.filings, outcome.versions
            );
            println!("Done!");
        }
    }

    Ok(())
}
