use std::path::PathBuf;

use clap::Args;
use outreach_agent::runtime::{OutreachRuntime, RunError};
use outreach_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use tracing::error;

use crate::commands::{
    CommandResult, EXIT_CLIENT_LOAD, EXIT_CONFIG, EXIT_PERSISTENCE, EXIT_RUNTIME,
};
use crate::logging::init_logging;

const COMMAND: &str = "run";

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    #[arg(long, value_name = "PATH", help = "Client list JSON file")]
    pub clients: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Where the ranked outreach records are written")]
    pub output: Option<PathBuf>,
    #[arg(long, value_name = "PATH", help = "Also write the run report to this file")]
    pub report: Option<PathBuf>,
    #[arg(long, value_name = "N", help = "Keep only the N highest-priority records")]
    pub top_n: Option<usize>,
    #[arg(long, value_name = "N", help = "Clients processed at the same time")]
    pub concurrency: Option<usize>,
}

impl RunArgs {
    fn overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            clients_path: self.clients,
            output_path: self.output,
            report_path: self.report,
            top_n: self.top_n,
            concurrency: self.concurrency,
            ..ConfigOverrides::default()
        }
    }
}

/// Runs the pipeline and returns the run report as pretty JSON.
pub fn run(config_path: Option<PathBuf>, args: RunArgs) -> CommandResult {
    let options = LoadOptions {
        require_file: config_path.is_some(),
        config_path,
        overrides: args.overrides(),
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            );
        }
    };
    init_logging(&config.logging);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let result = runtime.block_on(async {
        let outreach = OutreachRuntime::from_config(&config)?;
        outreach.run().await
    });

    match result {
        Ok(run) => match serde_json::to_string_pretty(&run.report) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => {
                CommandResult::failure(COMMAND, "serialization", error.to_string(), EXIT_RUNTIME)
            }
        },
        Err(run_error) => {
            error!(
                event_name = "cli.run.failed",
                error_class = run_error.error_class(),
                error = %run_error,
                "outreach run failed"
            );
            CommandResult::failure(
                COMMAND,
                run_error.error_class(),
                run_error.to_string(),
                exit_code_for(&run_error),
            )
        }
    }
}

fn exit_code_for(error: &RunError) -> u8 {
    match error {
        RunError::LoadClients(_) => EXIT_CLIENT_LOAD,
        RunError::Persist(_) => EXIT_PERSISTENCE,
        RunError::Prompts(_) => EXIT_RUNTIME,
    }
}
