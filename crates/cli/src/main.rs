// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! toolscout binary entry point.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use toolscout::cli::{Cli, Command};
use toolscout::config::Settings;
use toolscout::error::McpError;
use toolscout::orchestrator::Orchestrator;
use toolscout::server::AgentServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let settings = Settings::resolve(&cli.overrides());
    let orchestrator = match Orchestrator::load(&settings) {
        Ok(orchestrator) => Arc::new(orchestrator),
        Err(e) => fail(&e),
    };

    let outcome = match cli.command {
        Command::Serve => return serve(orchestrator).await,
        Command::List(cmd) => orchestrator
            .list(cmd.into())
            .and_then(|list| to_json(&list)),
        Command::Describe(cmd) => match orchestrator.describe(cmd.into()).await {
            Ok(description) => to_json(&description),
            Err(e) => Err(e),
        },
        Command::Exec(cmd) => {
            let args = cmd.into_args()?;
            match orchestrator.execute(args).await {
                Ok(output) => to_json(&output),
                Err(e) => Err(e),
            }
        }
    };
    orchestrator.shutdown().await;

    match outcome {
        Ok(json) => {
            println!("{}", json);
            Ok(())
        }
        Err(e) => fail(&e),
    }
}

async fn serve(orchestrator: Arc<Orchestrator>) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        servers = orchestrator.registry().len(),
        exec_enabled = orchestrator.exec_enabled(),
        "serving on stdio"
    );
    let warm_up = orchestrator.warm_up();
    let server = Arc::new(AgentServer::new(Arc::clone(&orchestrator)));
    let result = server.serve(tokio::io::stdin(), tokio::io::stdout()).await;

    if let Some(handle) = warm_up {
        handle.abort();
    }
    orchestrator.shutdown().await;
    tracing::info!("stdin closed, exiting");
    Ok(result?)
}

/// Logs go to stderr; stdout is reserved for results and protocol traffic.
fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match toolscout::env::log_filter() {
        Some(directives) => EnvFilter::try_new(directives)?,
        None if verbose => EnvFilter::new("toolscout=debug"),
        None => EnvFilter::new("toolscout=info"),
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, McpError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| McpError::InvalidArgument(format!("unserializable result: {}", e)))
}

fn fail(error: &McpError) -> ! {
    eprintln!("Error [{}]: {}", error.kind(), error);
    std::process::exit(1);
}
