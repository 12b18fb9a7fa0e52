//! Operator tool for the Bookshelf catalog.
//!
//! Commands:
//! - bookshelf-ctl token --subject <name> [--hours <n>]
//! - bookshelf-ctl author add --name <name>
//! - bookshelf-ctl author delete --id <id>
//! - bookshelf-ctl author list
//!
//! Authors have no HTTP write surface, so they are managed from here.

use anyhow::Context;
use chrono::Duration;
use clap::{Parser, Subcommand};

use bookshelf_server::{
    config::AppConfig, models::IdentityClaims, models::NewAuthor, repository, services::Services,
};

/// Bookshelf catalog administration
#[derive(Parser, Debug)]
#[command(name = "bookshelf-ctl")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mint a bearer token for the write endpoints
    Token {
        /// Subject recorded in the token
        #[arg(long)]
        subject: String,
        /// Validity in hours (defaults to the configured expiration)
        #[arg(long)]
        hours: Option<u64>,
    },

    /// Manage authors
    Author {
        #[command(subcommand)]
        action: AuthorCommand,
    },
}

#[derive(Subcommand, Debug)]
enum AuthorCommand {
    /// Register a new author
    Add {
        #[arg(long)]
        name: String,
    },
    /// Delete an author together with all of their books
    Delete {
        #[arg(long)]
        id: i32,
    },
    /// List authors with their book counts
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load().context("Failed to load configuration")?;

    match cli.command {
        Command::Token { subject, hours } => {
            let hours = hours.unwrap_or(config.auth.jwt_expiration_hours);
            let hours = i64::try_from(hours).context("--hours is too large")?;
            let token = IdentityClaims::new(subject, Duration::hours(hours))
                .create_token(&config.auth.jwt_secret)
                .context("Failed to sign token")?;
            println!("{}", token);
        }
        Command::Author { action } => {
            let store = repository::open_store(&config.database)
                .await
                .context("Failed to open catalog store")?;
            let catalog = Services::new(store, config.pagination).catalog;

            match action {
                AuthorCommand::Add { name } => {
                    let author = catalog.create_author(NewAuthor::new(name)).await?;
                    println!("{}\t{}", author.id, author.name);
                }
                AuthorCommand::Delete { id } => {
                    let books = catalog.delete_author(id).await?;
                    println!("Deleted author {} and {} book(s)", id, books);
                }
                AuthorCommand::List => {
                    for author in catalog.list_authors().await? {
                        println!("{}\t{}\t{} book(s)", author.id, author.name, author.books.len());
                    }
                }
            }
        }
    }

    Ok(())
}
