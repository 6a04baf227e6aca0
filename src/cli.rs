use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for reddsimp
#[derive(Parser, Debug)]
#[command(name = "reddsimp")]
#[command(about = "Inspect and manage Reddit Simplify extension settings from the command line")]
#[command(version)]
pub struct Cli {
    /// Browser profiles directory (overrides MOZ_PROFILES_DIR and auto-detection)
    #[arg(long, global = true, value_name = "DIR")]
    pub profiles_dir: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List browser profiles and whether they carry extension data
    Profiles,

    /// Print stored settings, optionally filtered by glob patterns
    Dump {
        /// Browser profile name
        #[arg(short, long, default_value = "default")]
        profile: String,

        /// Glob patterns over key names (OR logic), e.g. 'hide_comment_*'
        patterns: Vec<String>,

        /// Annotate known keys with descriptions (implies array output)
        #[arg(long)]
        describe: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputType::JsonObject)]
        output: OutputType,
    },

    /// Print a single stored value in raw form
    Get {
        /// Browser profile name
        #[arg(short, long, default_value = "default")]
        profile: String,

        /// Setting key
        key: String,
    },

    /// Write a single boolean setting
    Set {
        /// Browser profile name
        #[arg(short, long, default_value = "default")]
        profile: String,

        /// Setting key (must be part of the canonical schema)
        key: String,

        /// New value: true or false
        value: String,
    },

    /// Report schema drift in a profile's stored settings
    Check {
        /// Browser profile name
        #[arg(short, long, default_value = "default")]
        profile: String,

        /// Migrate the stored settings when drift is found
        #[arg(long)]
        fix: bool,
    },

    /// Clear stored settings and write the shipped defaults
    Reset {
        /// Browser profile name
        #[arg(short, long, default_value = "default")]
        profile: String,
    },

    /// Print the canonical settings schema with defaults and descriptions
    Keys,
}

/// Output format for dump
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OutputType {
    /// A single JSON object keyed by setting name
    JsonObject,
    /// A JSON array of key/value entries
    JsonArray,
}
