use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rag-index")]
#[command(version)]
#[command(about = "Build and query a local semantic search index", long_about = None)]
pub struct Cli {
    /// YAML configuration file; `RAG_*` variables override it
    #[arg(long, env = "RAG_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Chunk, embed and store one or more text files
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Rank stored chunks against a query and print them as JSON
    Search {
        query: String,

        /// Maximum number of results (defaults to search.default_limit)
        #[arg(long, short)]
        limit: Option<usize>,
    },

    /// Rewrite the vector log with one record per live key
    Compact,
}
