use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use streamforge::cli::{Cli, Command};
use streamforge::config::StreamforgeConfig;
use streamforge::engine::{NativeEngineBuilder, ProcessExecutor};
use streamforge::flow_ops::{LocalFlowOperations, StopCommand};
use streamforge::program::Program;
use streamforge::ui::{self, BuildProgress};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = StreamforgeConfig::load().context("failed to load streamforge.toml")?;
    let stage_timeout = cli
        .stage_timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.stage_timeout());

    match cli.command {
        Command::Stop { flow_name } => {
            let command = StopCommand::new(LocalFlowOperations::new(&config.flows_dir));
            command.execute(&flow_name).await?;
        }
        Command::Provision {
            target_dir,
            schema,
            query,
        } => {
            let builder = NativeEngineBuilder::new(&target_dir)
                .schema(schema.unwrap_or_else(|| config.default_schema.clone()))
                .query(query.unwrap_or_else(|| config.default_query.clone()))
                .stage_timeout(stage_timeout);

            let progress = BuildProgress::start(&target_dir.display().to_string());
            let result = builder
                .build_with(&ProcessExecutor, |state| progress.update(state))
                .await;
            progress.complete(&result);
            progress.print_report(&result?);
        }
        Command::Inspect { bundle, work_dir } => {
            let program = Program::open(&bundle, work_dir)?;
            let spec = program.specification()?;
            ui::print_program(&program, &spec);
        }
    }

    Ok(())
}
