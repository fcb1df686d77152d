//! Command-line argument parsing for docbuddy
//!
//! Clap-based CLI with subcommands for the population and query entry
//! points, the interactive shell, and diagnostics.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// docbuddy - Ask questions over your local documents using Ollama
#[derive(Parser, Debug)]
#[command(name = "docbuddy")]
#[command(version = "0.3.0")]
#[command(about = "Ask questions over your local document library with Ollama models", long_about = None)]
pub struct Args {
    /// Ollama host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Ollama port
    #[arg(long, default_value_t = 11434)]
    pub port: u16,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress all output except results)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk, embed, and index documents from a data directory
    Populate {
        /// Directory containing source documents
        #[arg(long, default_value = "data")]
        data_path: PathBuf,

        /// Vector index location (overrides config)
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Chunk size in characters
        #[arg(long, default_value_t = 600)]
        chunk_size: usize,

        /// Overlap between consecutive chunks in characters
        #[arg(long, default_value_t = 100)]
        chunk_overlap: usize,

        /// Clear the index before populating
        #[arg(long)]
        reset: bool,
    },

    /// Ask a single question against the indexed corpus
    Query {
        /// The question text
        query_text: String,

        /// Generation model (overrides config)
        #[arg(short, long)]
        model: Option<String>,

        /// Number of chunks to retrieve
        #[arg(short, long, default_value_t = 5)]
        k: usize,

        /// Minimum relevance score in [0.0, 1.0]
        #[arg(long, default_value_t = 0.0)]
        score_threshold: f32,

        /// Include relevance scores in the output
        #[arg(long)]
        with_scores: bool,

        /// Emit machine-readable JSON instead of formatted text
        #[arg(long)]
        json: bool,

        /// Vector index location (overrides config)
        #[arg(long)]
        index_path: Option<PathBuf>,
    },

    /// Start the interactive question shell
    Start {
        /// Data directory used by the shell's `reset` command
        #[arg(long, default_value = "data")]
        data_path: PathBuf,

        /// Vector index location (overrides config)
        #[arg(long)]
        index_path: Option<PathBuf>,
    },

    /// Run environment diagnostics
    Doctor,

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Get Ollama base URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Verbosity {
    /// Check if progress output should be shown
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Check if per-step details should be shown
    pub fn show_details(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with(verbose: u8, quiet: bool) -> Args {
        Args {
            host: "127.0.0.1".to_string(),
            port: 11434,
            config: None,
            verbose,
            quiet,
            command: Commands::Doctor,
        }
    }

    #[test]
    fn test_verbosity_quiet_wins() {
        assert_eq!(args_with(2, true).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(args_with(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(args_with(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(args_with(3, false).verbosity(), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_ollama_url() {
        let mut args = args_with(0, false);
        args.host = "localhost".to_string();
        args.port = 8080;
        assert_eq!(args.ollama_url(), "http://localhost:8080");
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert!(!Verbosity::Normal.show_details());
        assert!(Verbosity::Verbose.show_details());
    }

    #[test]
    fn test_parse_populate_defaults() {
        let args = Args::try_parse_from(["docbuddy", "populate"]).unwrap();
        match args.command {
            Commands::Populate {
                chunk_size,
                chunk_overlap,
                reset,
                ..
            } => {
                assert_eq!(chunk_size, 600);
                assert_eq!(chunk_overlap, 100);
                assert!(!reset);
            }
            _ => panic!("expected populate"),
        }
    }

    #[test]
    fn test_parse_query_defaults() {
        let args = Args::try_parse_from(["docbuddy", "query", "what is this?"]).unwrap();
        match args.command {
            Commands::Query {
                query_text,
                k,
                score_threshold,
                with_scores,
                json,
                ..
            } => {
                assert_eq!(query_text, "what is this?");
                assert_eq!(k, 5);
                assert_eq!(score_threshold, 0.0);
                assert!(!with_scores);
                assert!(!json);
            }
            _ => panic!("expected query"),
        }
    }
}
