mod checker;
mod cli;
mod compare;
mod compiler;
mod config;
mod core;
mod judger;
mod languages;
mod mtp;
mod runner;
mod session;
mod transport;

use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use crate::cli::{Cli, Mode};
use crate::compare::Comparator;
use crate::config::JudgeConfig;
use crate::judger::Judge;
use crate::runner::LimitedRunner;
use crate::transport::ZmqTransport;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Session failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("ana=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    languages::init_languages(cli.languages.as_deref())?;
    match &cli.languages {
        Some(path) => info!("Loaded language configurations from {}", path.display()),
        None => info!("Using built-in language configurations"),
    }
    info!(
        "Supported languages: {}",
        languages::get_supported_languages().join(", ")
    );

    let config = JudgeConfig {
        output_limit_bytes: cli.output_limit,
        work_dir: cli.work_dir.clone(),
        comparator: if cli.strict_compare {
            Comparator::strict()
        } else {
            Comparator::default()
        },
        ..Default::default()
    };
    let runner = LimitedRunner::from_config(&config);
    let judge = Judge::new(&runner, &config);

    let context = zmq::Context::new();
    let summary = match cli.mode {
        Mode::Lockstep => {
            let mut transport = ZmqTransport::reply(&context, &cli.recv_endpoint)
                .context("Failed to set up the reply socket")?;
            session::run_lockstep(&mut transport, &judge, cli.reply_format, cli.with_summary)
                .await?
        }
        Mode::Streaming => {
            let mut transport =
                ZmqTransport::pipeline(&context, &cli.recv_endpoint, &cli.send_endpoint)
                    .context("Failed to set up the job sockets")?;
            session::run_streaming(&mut transport, &judge).await?
        }
    };

    info!(
        "Job {} finished: {} over {} case(s)",
        summary.job_id, summary.status, summary.case_index
    );
    Ok(())
}
