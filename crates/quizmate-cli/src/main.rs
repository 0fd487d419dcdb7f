//! quizmate CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod input;

#[derive(Parser)]
#[command(name = "quizmate", version, about = "Interactive quizzes from generated study material")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a quiz in the terminal
    Run {
        /// Path to a content bundle JSON file
        #[arg(long)]
        bundle: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Shuffle questions within each question type
        #[arg(long)]
        shuffle: bool,

        /// Seed for the shuffle (implies --shuffle)
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the recommendation gateway
        #[arg(long)]
        offline: bool,

        /// Save the completion summary as JSON
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a content bundle
    Validate {
        /// Path to a content bundle JSON file
        #[arg(long)]
        bundle: PathBuf,
    },

    /// Create starter config and example bundle
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizmate=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            bundle,
            config,
            shuffle,
            seed,
            offline,
            output,
        } => commands::run::execute(bundle, config, shuffle, seed, offline, output).await,
        Commands::Validate { bundle } => commands::validate::execute(bundle),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
