//! Donation Service - command line front end to the donation engine.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use common::{AppError, AppResult};
use donation_service_lib::MigrateAction;

#[derive(Parser)]
#[command(name = "donation-service")]
#[command(about = "Meal donation and matching engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateCommands,
    },
    /// Check that the database is reachable
    Health,
    /// Run one matching pass and print the report
    Match,
    /// Print the donation summary for a day
    Summary {
        /// Day to summarize (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Meal catalog commands
    Meal {
        #[command(subcommand)]
        action: MealCommands,
    },
    /// Donate a meal
    Donate {
        #[arg(long)]
        meal: i32,
        #[arg(long)]
        donor: String,
    },
    /// Claim a donation
    Claim {
        #[arg(long)]
        donation: i32,
        #[arg(long)]
        name: String,
    },
    /// Ask for any of the given meals
    Request {
        #[arg(long)]
        name: String,
        #[arg(long = "meal", required = true)]
        meals: Vec<i32>,
    },
    /// Cancel a pending request
    Cancel {
        #[arg(long)]
        request: i32,
    },
    /// List requests: pending ones, or those of one person
    Requests {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Subcommand)]
enum MigrateCommands {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[derive(Subcommand)]
enum MealCommands {
    /// Add a meal to the catalog
    Add {
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        description: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let rendered =
        serde_json::to_string_pretty(value).map_err(|e| AppError::internal(e.to_string()))?;
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateCommands::Up => MigrateAction::Up,
                MigrateCommands::Down => MigrateAction::Down,
                MigrateCommands::Status => MigrateAction::Status,
                MigrateCommands::Fresh => MigrateAction::Fresh,
            };
            donation_service_lib::run_migrations(migrate_action).await
        }
        Commands::Health => donation_service_lib::check_health().await,
        command => run(command).await,
    };

    if let Err(e) = result {
        eprintln!("error [{}]: {}", e.code(), e.user_message());
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> AppResult<()> {
    let engine = donation_service_lib::connect_from_env().await?;

    match command {
        Commands::Migrate { .. } | Commands::Health => {}
        Commands::Match => {
            print_json(&engine.check_and_fulfill().await?)?;
        }
        Commands::Summary { date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            print_json(&engine.donations_summary_by_date(date).await?)?;
        }
        Commands::Meal {
            action: MealCommands::Add { date, description },
        } => {
            print_json(&engine.create_meal(&description, date).await?)?;
        }
        Commands::Donate { meal, donor } => {
            let id = engine.create_donation(meal, &donor).await?;
            println!("Created donation {}", id);
        }
        Commands::Claim { donation, name } => {
            engine.claim_donation(donation, &name).await?;
            println!("Donation {} claimed by {}", donation, name);
        }
        Commands::Request { name, meals } => {
            let id = engine.create_donation_request(&name, meals).await?;
            println!("Created donation request {}", id);
        }
        Commands::Cancel { request } => {
            engine.cancel_donation_request(request).await?;
            println!("Cancelled donation request {}", request);
        }
        Commands::Requests { name, date } => {
            let views = match name {
                Some(name) => engine.donation_requests_by_requester(&name, date).await?,
                None => engine.pending_donation_requests().await?,
            };
            print_json(&views)?;
        }
    }

    Ok(())
}
