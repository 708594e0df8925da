//! Shelfwise CLI - Database migrations, shop sessions and one-off runs.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! sw-cli migrate
//!
//! # Register a shop's offline access token
//! sw-cli session save -s acme.myshopify.com -t shpat_... --scope read_products,write_products
//!
//! # Run the inventory compliance sweep for one shop now
//! sw-cli check acme.myshopify.com
//!
//! # Import a retailer product or a PSA certificate now
//! sw-cli import acme.myshopify.com https://retailer.example.com/products/blue-mug
//! sw-cli psa acme.myshopify.com 12345678 249.99
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `session` - Save, list or delete shop sessions
//! - `check` - Run a compliance check
//! - `import` / `psa` - Run an import without the job queue

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "sw-cli")]
#[command(author, version, about = "Shelfwise CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage shop sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Run the inventory compliance check for a shop
    Check {
        /// Shop domain (`*.myshopify.com`)
        shop: String,
    },
    /// Import a retailer product page into a shop
    Import {
        /// Shop domain (`*.myshopify.com`)
        shop: String,
        /// Product page URL
        url: String,
    },
    /// Import a PSA-graded card into a shop
    Psa {
        /// Shop domain (`*.myshopify.com`)
        shop: String,
        /// PSA certificate number
        cert: String,
        /// Listing price
        price: Decimal,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Save (or replace) a shop's offline access token
    Save {
        /// Shop domain (`*.myshopify.com`)
        #[arg(short, long)]
        shop: String,

        /// Offline Admin API access token
        #[arg(short, long)]
        token: String,

        /// Granted scopes
        #[arg(long, default_value = "")]
        scope: String,
    },
    /// List shops with an active session
    List,
    /// Delete a shop's session
    Delete {
        /// Shop domain (`*.myshopify.com`)
        #[arg(short, long)]
        shop: String,
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
        Commands::Session { action } => match action {
            SessionAction::Save { shop, token, scope } => {
                commands::session::save(&shop, token, &scope).await?;
            }
            SessionAction::List => commands::session::list().await?,
            SessionAction::Delete { shop } => commands::session::delete(&shop).await?,
        },
        Commands::Check { shop } => commands::run::check(&shop).await?,
        Commands::Import { shop, url } => commands::run::import(&shop, &url).await?,
        Commands::Psa { shop, cert, price } => commands::run::psa(&shop, &cert, price).await?,
    }
    Ok(())
}
