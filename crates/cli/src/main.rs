//! Order Desk CLI - user registry and record store tools.
//!
//! # Usage
//!
//! ```bash
//! # List registry users and their pages
//! od-cli users list
//!
//! # Add a user with the default pages
//! od-cli users add -u sara -c 1234
//!
//! # Add a manager with selected pages
//! od-cli users add -u omar -c 4321 --manager -p Home,Orders,Settings
//!
//! # Reset a forgotten access code
//! od-cli users passwd -u sara -c 5678
//!
//! # Delete a user
//! od-cli users delete -u sara
//!
//! # Dump the current store rows as JSON
//! od-cli orders export --out orders.json
//! ```
//!
//! Configuration is read from the same environment variables as the
//! dashboard server.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "od-cli")]
#[command(author, version, about = "Order Desk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage dashboard users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },
    /// Work with the order record store
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum UsersAction {
    /// List every user
    List,
    /// Create a new user
    Add {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Access code
        #[arg(short, long)]
        code: String,

        /// Mark the user as a manager
        #[arg(long)]
        manager: bool,

        /// Granted pages, comma separated (default: Home,Orders,Search,Dashboard)
        #[arg(short, long, value_delimiter = ',')]
        pages: Vec<String>,
    },
    /// Set a user's access code
    Passwd {
        /// Username
        #[arg(short, long)]
        username: String,

        /// New access code
        #[arg(short, long)]
        code: String,
    },
    /// Delete a user
    Delete {
        /// Username
        #[arg(short, long)]
        username: String,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Write every stored order as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Users { action } => match action {
            UsersAction::List => commands::users::list().await?,
            UsersAction::Add {
                username,
                code,
                manager,
                pages,
            } => commands::users::add(&username, &code, manager, &pages).await?,
            UsersAction::Passwd { username, code } => {
                commands::users::passwd(&username, &code).await?;
            }
            UsersAction::Delete { username } => commands::users::delete(&username).await?,
        },
        Commands::Orders { action } => match action {
            OrdersAction::Export { out } => commands::orders::export(out.as_deref()).await?,
        },
    }
    Ok(())
}
