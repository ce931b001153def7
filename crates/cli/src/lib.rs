pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::run::RunArgs;

#[derive(Debug, Parser)]
#[command(
    name = "outreach",
    about = "Client outreach pipeline CLI",
    long_about = "Research clients, analyze opportunities, and draft personalized outreach emails.",
    after_help = "Examples:\n  outreach run --top-n 5\n  outreach config\n  outreach doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, value_name = "PATH", help = "Explicit config file path")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the research, analysis, and email pipeline over the client list")]
    Run(RunArgs),
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, client file readability, and collaborator settings")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Run(args) => commands::run::run(cli.config, args),
        Command::Config => commands::CommandResult {
            exit_code: 0,
            output: commands::config::run(cli.config.as_deref()),
        },
        Command::Doctor { json } => commands::doctor::run(cli.config, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
