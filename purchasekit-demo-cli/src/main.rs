//! PurchaseKit Demo CLI
//!
//! Command-line interface for trying the purchase coordinator against the
//! in-memory mock backend.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

mod commands;
mod ui;

use commands::DemoOptions;

#[derive(Parser)]
#[command(name = "purchasekit-demo")]
#[command(about = "PurchaseKit Demo CLI - Try in-app purchase flows from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Custom storage directory (can also be set via PURCHASEKIT_DEMO_DIR env var)
    #[arg(long, global = true, env = "PURCHASEKIT_DEMO_DIR")]
    storage_dir: Option<PathBuf>,

    /// JSON file with the product catalog (defaults to a built-in catalog)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Simulated backend latency in milliseconds
    #[arg(long, global = true, default_value = "500")]
    latency_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products {
        /// Product ids to fetch (all catalog products when omitted)
        ids: Vec<String>,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Purchase a product
    Purchase {
        /// Product id
        product_id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Restore previous purchases
    Restore,

    /// Check free trial eligibility for a product
    Eligibility {
        /// Product id
        product_id: String,
    },

    /// Show current entitlements
    Entitlements {
        /// Only show active entitlements
        #[arg(short, long)]
        active: bool,

        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Associate purchases with a user id
    Login {
        /// Application user id
        user_id: String,

        /// Email forwarded as a profile attribute
        #[arg(long)]
        email: Option<String>,
    },

    /// Log out and return to an anonymous identity
    Logout,

    /// Delete all saved demo state
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Menu-driven session
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("purchasekit_demo_cli=debug,purchasekit_lib=debug")
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("purchasekit_demo_cli=info,purchasekit_lib=warn")
            .init();
    }

    // Setup storage directory
    let storage_dir = cli.storage_dir.unwrap_or_else(|| {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("purchasekit-demo")
    });

    let options = DemoOptions {
        storage_dir,
        catalog: cli.catalog,
        latency: Duration::from_millis(cli.latency_ms),
        verbose: cli.verbose,
    };

    // Dispatch commands
    match cli.command {
        Commands::Products { ids, json } => {
            commands::products::run(&options, ids, json).await?;
        }
        Commands::Purchase { product_id, yes } => {
            commands::purchase::buy(&options, &product_id, yes).await?;
        }
        Commands::Restore => {
            commands::purchase::restore(&options).await?;
        }
        Commands::Eligibility { product_id } => {
            commands::purchase::eligibility(&options, &product_id).await?;
        }
        Commands::Entitlements { active, json } => {
            commands::entitlements::run(&options, active, json).await?;
        }
        Commands::Login { user_id, email } => {
            commands::identity::log_in(&options, &user_id, email).await?;
        }
        Commands::Logout => {
            commands::identity::log_out(&options).await?;
        }
        Commands::Reset { yes } => {
            commands::entitlements::reset(&options, yes)?;
        }
        Commands::Interactive => {
            commands::interactive::run(&options).await?;
        }
    }

    Ok(())
}
