use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "feedpipe")]
#[command(about = "Resumable, batched feed importer (CSV, RSS/Atom, OPML, sitemaps)")]
#[command(version)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage importer configurations
    Importer {
        #[command(subcommand)]
        command: ImporterCommands,
    },

    /// Add a feed source (file, directory or http(s) URL)
    Add {
        /// Path or URL to import from
        source: String,

        /// Importer configuration to use
        #[arg(short, long)]
        importer: String,
    },

    /// List all feeds
    List,

    /// Remove a feed and everything it imported
    Remove {
        /// Feed id
        id: i64,
    },

    /// Import the next batch of one feed, or of every feed
    Import {
        /// Feed id
        id: Option<i64>,

        /// Import every feed
        #[arg(long, conflicts_with = "id")]
        all: bool,

        /// Keep importing until the run is complete
        #[arg(long)]
        until_done: bool,
    },

    /// Delete one batch of what a feed imported
    Clear {
        /// Feed id
        id: i64,
    },

    /// Delete expired entities of one feed, or of every feed
    Expire {
        /// Feed id
        id: Option<i64>,

        /// Expire every feed
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum ImporterCommands {
    /// Add or replace an importer from a JSON file (or inline JSON)
    Add {
        /// Path to a JSON file, or the JSON document itself
        config: String,
    },

    /// List importer configurations
    List,
}
