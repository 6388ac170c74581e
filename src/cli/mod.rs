//! CLI module for Duett.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Duett - turn a document into a two-host podcast
///
/// Reads a PDF or text file, works out the questions a listener would ask,
/// answers them from the document, and records the answers as a conversation.
#[derive(Parser, Debug)]
#[command(name = "duett")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "DUETT_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Duett and verify system requirements
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Generate a podcast from a document
    Generate {
        /// PDF or plain-text document
        document: String,

        /// Output WAV file (default: <output_dir>/<document name>.wav)
        #[arg(short, long)]
        output: Option<String>,

        /// Also write the script text to this file
        #[arg(long)]
        script_out: Option<String>,

        /// Chunks retrieved per question
        #[arg(long)]
        top_k: Option<usize>,

        /// Word ceiling for the script
        #[arg(long)]
        word_limit: Option<usize>,

        /// Chat model for questions, answers and the script
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "speech.speaker_a.voice")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
