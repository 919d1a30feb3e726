//! apiprint CLI - API surface fingerprints for compiled modules
//!
//! Extracts the public surface of a module as signature tokens, compares two
//! builds and decides the next semantic version.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod filter;
mod output;
mod stamp;

use commands::compare::CompareOptions;
use config::ApiprintConfig;
use output::{OutputConfig, OutputFormat};

/// API surface fingerprinting and semantic version decisions.
#[derive(Parser)]
#[command(name = "apiprint")]
#[command(author, version)]
#[command(about = "API surface fingerprinting and semver decisions for compiled modules")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  apiprint extract bin/Contoso.Core.dll
  apiprint compare old/ new/ --current-version 1.4.2
  apiprint compare old/ new/ --current-version 1.4.2 --stamp-dir src")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Single-line JSON output
    #[arg(long, global = true)]
    compact: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the API surface of a module
    #[command(visible_alias = "x")]
    Extract {
        /// Module file to analyze
        module: PathBuf,

        /// Directory probed for referenced modules (default: the module's directory)
        #[arg(long)]
        search_path: Option<PathBuf>,

        /// Emit base-type tokens and only list declared members
        #[arg(long)]
        check_inheritance: bool,

        /// Include non-public entries
        #[arg(short, long)]
        all: bool,
    },

    /// Compare two builds and decide the next version
    #[command(visible_alias = "cmp")]
    Compare {
        /// Previous build (module file or directory)
        old: PathBuf,

        /// Current build (module file or directory)
        new: PathBuf,

        /// Version of the previous build
        #[arg(long)]
        current_version: Option<String>,

        /// Glob patterns selecting modules inside directories
        #[arg(long = "files", num_args = 1..)]
        files: Vec<String>,

        /// Directory probed for referenced modules (default: the new module's directory)
        #[arg(long)]
        search_path: Option<PathBuf>,

        /// Emit base-type tokens and only list declared members
        #[arg(long)]
        check_inheritance: bool,

        /// Patch version stamps in source files below this directory
        #[arg(long)]
        stamp_dir: Option<PathBuf>,

        /// Report stamp files without writing them
        #[arg(long)]
        dry_run: bool,
    },
}

/// Set up logging based on verbosity flags
fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = ApiprintConfig::load(std::path::Path::new("."));

    // CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    let mut output = OutputConfig::auto_detect(format).with_color(config.use_color());
    if cli.compact {
        output = output.compact();
    }

    match cli.command {
        Commands::Extract {
            module,
            search_path,
            check_inheritance,
            all,
        } => commands::extract::run(
            &module,
            config.search_path(search_path),
            config.reference_dirs(),
            config.check_inheritance(check_inheritance),
            all,
            &output,
        ),
        Commands::Compare {
            old,
            new,
            current_version,
            files,
            search_path,
            check_inheritance,
            stamp_dir,
            dry_run,
        } => {
            let options = CompareOptions {
                old,
                new,
                current_version,
                files: config.include_patterns(files),
                search_path: config.search_path(search_path),
                reference_dirs: config.reference_dirs().to_vec(),
                check_inheritance: config.check_inheritance(check_inheritance),
                stamp_dir,
                stamp_file_name: config.stamp_file_name().to_string(),
                dry_run,
            };
            commands::compare::run(&options, &output)
        }
    }
}
