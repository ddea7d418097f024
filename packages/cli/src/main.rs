mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, normalize, outline, CheckArgs, NormalizeArgs, OutlineArgs};
use tracing_subscriber::EnvFilter;

/// Paper CLI - validate, normalize and outline Paper documents
#[derive(Parser, Debug)]
#[command(name = "paper")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate documents against the editor schema
    Check(CheckArgs),

    /// Rewrite documents the way the editor settles them
    Normalize(NormalizeArgs),

    /// Print the heading structure of documents
    Outline(OutlineArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Check(args) => check(args, &cwd),
            Command::Normalize(args) => normalize(args, &cwd),
            Command::Outline(args) => outline(args, &cwd),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
