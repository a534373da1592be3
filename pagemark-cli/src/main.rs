//! Pagemark CLI - Command-line library manager for the Pagemark reader

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pagemark_core::storage::LocalStorage;
use pagemark_core::LibraryStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Library directory (defaults to $PAGEMARK_LIBRARY, then ./pagemark_data)
    #[arg(short, long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an ebook file into the library
    Import {
        /// Input file path
        input: String,

        /// Title (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Author
        #[arg(short, long)]
        author: Option<String>,

        /// Language code
        #[arg(short = 'L', long)]
        language: Option<String>,

        /// Category to shelve the book under (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
    },

    /// List books in the library
    List {
        /// Only books in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Filter by title or author substring
        #[arg(short, long)]
        search: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display a book's record, reading position included
    Info {
        /// Book id
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add or remove categories on a book
    Tag {
        /// Book id
        id: String,

        /// Category to add (repeatable)
        #[arg(short, long)]
        add: Vec<String>,

        /// Category to remove (repeatable)
        #[arg(short, long)]
        remove: Vec<String>,
    },

    /// Clear a book's reading position back to unread
    Reset {
        /// Book id
        id: String,
    },

    /// Remove a book and its files from the library
    Delete {
        /// Book id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "pagemark_cli=debug,pagemark_core=debug"
    } else {
        "pagemark_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let library_dir = cli
        .library
        .or_else(|| std::env::var("PAGEMARK_LIBRARY").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./pagemark_data"));
    tokio::fs::create_dir_all(&library_dir).await?;

    let storage = Arc::new(LocalStorage::new(&library_dir));
    let store = LibraryStore::open(storage.clone(), storage).await?;

    match cli.command {
        Commands::Import {
            input,
            title,
            author,
            language,
            category,
        } => commands::import(&store, &input, title, author, language, category).await,

        Commands::List {
            category,
            search,
            json,
        } => commands::list(&store, category, search, json).await,

        Commands::Info { id, json } => commands::info(&store, &id, json).await,

        Commands::Tag { id, add, remove } => commands::tag(&store, &id, add, remove).await,

        Commands::Reset { id } => commands::reset(&store, &id).await,

        Commands::Delete { id } => commands::delete(&store, &id).await,
    }
}
