use std::{io, path::PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use proptrans_cli::{
    config::AppConfig,
    logging,
    sync::{SyncOptions, run_sync_command},
    translate::{TranslateOptions, run_translate_command},
    validation::run_validate_command,
};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (YAML, or TOML by extension)
    #[arg(short, long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    commands: Commands,
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate new, changed and previously failed keys in target files.
    Translate {
        /// Target files to process instead of scanning the input folder
        #[arg(short, long = "file")]
        files: Vec<String>,

        /// Validate and select keys only; write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Bring a target file's keys in line with its source file.
    Sync {
        /// Source-language properties file
        #[arg(short, long)]
        source: String,

        /// Target-language properties file
        #[arg(short, long)]
        target: String,

        /// Report missing and extra keys without rewriting the target
        #[arg(long)]
        dry_run: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check target files for encoding, lint and placeholder problems.
    Validate {
        /// Source-language properties file
        #[arg(short, long)]
        source: String,

        /// Target files to check
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

async fn run(args: Args) -> Result<(), String> {
    if let Commands::Completions { shell } = args.commands {
        generate(shell, &mut Args::command(), "proptrans", &mut io::stdout());
        return Ok(());
    }

    let config = AppConfig::load(&args.config)?;
    let mut logging_config = config.logging.clone();
    if !matches!(args.commands, Commands::Translate { .. }) {
        logging_config.log_file_path = None;
    }
    let _guard = logging::init(&logging_config)?;
    if !args.config.exists() {
        warn!(path = %args.config.display(), "config file not found, using defaults");
    }

    match args.commands {
        Commands::Translate { files, dry_run } => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty());
            run_translate_command(config, TranslateOptions { files, dry_run }, api_key)
                .await
                .map(|_| ())
        }
        Commands::Sync {
            source,
            target,
            dry_run,
            json,
        } => run_sync_command(SyncOptions {
            source,
            target,
            dry_run,
            json,
        }),
        Commands::Validate { source, targets } => run_validate_command(&source, &targets),
        Commands::Completions { .. } => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
