//! neetprep CLI — take timed NEET practice tests in the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::SelectorArgs;

#[derive(Parser)]
#[command(name = "neetprep", version, about = "Timed NEET practice tests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a timed test
    Take {
        #[command(flatten)]
        selector: SelectorArgs,

        /// Question bank file or directory to use instead of the configured catalog
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Output directory for reports (defaults to `output_dir` from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Report formats: json, html, markdown, all, none (comma-separated)
        #[arg(long, default_value = "json,html")]
        format: String,

        /// Start immediately, skipping the instructions screen
        #[arg(long)]
        no_instructions: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Score an answer sheet against a question bank
    Score {
        /// Question bank file or directory
        #[arg(long)]
        bank: PathBuf,

        /// Answer sheet TOML
        #[arg(long)]
        answers: PathBuf,

        #[command(flatten)]
        selector: SelectorArgs,

        /// Output directory for reports
        #[arg(long, default_value = "./neetprep-results")]
        output: PathBuf,

        /// Output format: text, json, html, markdown, all
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and sample question bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("neetprep=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            selector,
            bank,
            output,
            format,
            no_instructions,
            config,
        } => commands::take::execute(selector, bank, output, format, no_instructions, config).await,
        Commands::Score {
            bank,
            answers,
            selector,
            output,
            format,
            config,
        } => commands::score::execute(bank, answers, selector, output, format, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
