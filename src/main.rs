mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let profiles_dir = cli.profiles_dir.as_deref();

    match cli.command {
        Commands::Profiles => commands::list_profiles(profiles_dir),
        Commands::Dump {
            profile,
            patterns,
            describe,
            output,
        } => {
            let patterns: Vec<&str> = patterns.iter().map(String::as_str).collect();
            commands::dump(&profile, &patterns, describe, output, profiles_dir)
        }
        Commands::Get { profile, key } => commands::get(&profile, &key, profiles_dir),
        Commands::Set {
            profile,
            key,
            value,
        } => commands::set(&profile, &key, &value, profiles_dir),
        Commands::Check { profile, fix } => commands::check(&profile, fix, profiles_dir),
        Commands::Reset { profile } => commands::reset(&profile, profiles_dir),
        Commands::Keys => commands::keys(),
    }
}

/// Initialise logging on stderr. The default level is `warn` so command
/// output stays clean; `--verbose` raises it to `debug` and lets `RUST_LOG`
/// override the filter.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("warn")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
