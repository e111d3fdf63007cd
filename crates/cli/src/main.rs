//! Botsmith CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! botsmith-cli migrate
//!
//! # Seed the plan catalog
//! botsmith-cli seed plans --file plans.json
//!
//! # Create a user row for an auth subject
//! botsmith-cli user create -s "auth0|abc123" --allowance 1000
//!
//! # Reset free-coupon balances manually
//! botsmith-cli tokens reset-free
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed plans` - Seed the plan catalog
//! - `user create` - Provision a user row
//! - `tokens reset-free` - Reset all free-coupon balances

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "botsmith-cli")]
#[command(author, version, about = "Botsmith CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Token maintenance
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Seed the plan catalog
    Plans {
        /// JSON file with the catalog; built-in defaults when omitted
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Provision a user row for an identity-provider subject
    Create {
        /// Auth subject (identity provider's stable id)
        #[arg(short, long)]
        subject: String,

        /// Free token allowance
        #[arg(long, default_value_t = 1000)]
        allowance: i32,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Reset every user's free balance to their allowance
    ResetFree,
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
        Commands::Seed { target } => match target {
            SeedTarget::Plans { file } => {
                commands::seed::plans(file.as_deref()).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Create { subject, allowance } => {
                commands::users::create(&subject, allowance).await?;
            }
        },
        Commands::Tokens { action } => match action {
            TokensAction::ResetFree => commands::tokens::reset_free().await?,
        },
    }
    Ok(())
}
