//! Bazaar CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! bazaar migrate
//!
//! # Grant or revoke access to the admin order listing
//! bazaar user promote alice
//! bazaar user demote alice
//!
//! # Load products and their image paths from YAML
//! bazaar seed products fixtures/products.yaml
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed the database from fixture files
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Mark a user as super user
    Promote {
        /// Login name of the user
        username: String,
    },
    /// Clear a user's super user flag
    Demote {
        /// Login name of the user
        username: String,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert products (and image paths) from a YAML file
    Products {
        /// Path to the YAML file
        file: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Promote { username } => {
                commands::user::set_super_user(&username, true).await?;
            }
            UserAction::Demote { username } => {
                commands::user::set_super_user(&username, false).await?;
            }
        },
        Commands::Seed { target } => match target {
            SeedTarget::Products { file } => commands::seed::products(&file).await?,
        },
    }
    Ok(())
}
