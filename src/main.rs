mod candidates;
mod cli;
mod collaborators;
mod commands;
mod corpus;
mod error;
mod model;
mod pattern;
mod precision;
mod run_file;
mod scoring;
mod tokenize;
mod util;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, CollaboratorArgs, Commands, ModelChoice};

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate(args) => {
            require_neural_resources(args.model, &args.collaborators);
            commands::evaluate::run(args)
        }
        Commands::Patterns(args) => {
            require_neural_resources(args.model, &args.collaborators);
            commands::patterns::run(args)
        }
        Commands::Judge(args) => {
            require_neural_resources(ModelChoice::Sm, &args.collaborators);
            commands::judge::run(args)
        }
        Commands::Qrels(args) => commands::qrels::run(args),
    }
}

/// Exits with a usage error when the neural strategy lacks its model files.
fn require_neural_resources(model: ModelChoice, collaborators: &CollaboratorArgs) {
    if model != ModelChoice::Sm {
        return;
    }

    let missing = collaborators.missing_neural_resources();
    if !missing.is_empty() {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                format!(
                    "the sm model needs the word embeddings cache and the model file; missing {}",
                    missing.join(", ")
                ),
            )
            .exit();
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
