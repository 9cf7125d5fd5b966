//! ragstack - plan and apply the RAG backend deployment
//!
//! Loads the deployment settings for one environment, builds the default
//! role / vector store / knowledge base orchestration and runs it against
//! the dry-run backend.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ragstack::backend::DryRunBackend;
use ragstack::config::{load_context, DEFAULT_CONFIG_FILE};
use ragstack::events::LoggingEventSink;
use ragstack::orchestrator::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    /// Human readable
    Pretty,
    /// One JSON object per line
    Json,
}

/// Plan and apply the RAG backend deployment
#[derive(Parser, Debug)]
#[command(name = "ragstack", version, about)]
#[command(after_help = "EXAMPLES:\n  \
                  Plan the default environment:\n    ragstack\n\n\
                  Plan a named environment from another config file:\n    ragstack prod --config deploy/ragstack.json\n\n\
                  Print the full plan as JSON:\n    ragstack dev --print-plan")]
struct Cli {
    /// Environment to deploy (defaults to the config file's default)
    environment: Option<String>,

    /// Path to the config file
    #[arg(long, short, env = "RAGSTACK_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Print the full plan instead of the summary
    #[arg(long)]
    print_plan: bool,
}

fn setup_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    match format {
        LogFormat::Pretty => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_tracing(cli.log_format);

    let context = load_context(&cli.config, cli.environment.as_deref())
        .with_context(|| format!("Failed to load deployment settings from {}", cli.config.display()))?;
    info!(
        environment = %context.environment,
        account = %context.account_id,
        region = %context.region,
        "Deployment settings loaded"
    );

    let orchestrator = Orchestrator::rag_builder()
        .event_sink(Arc::new(LoggingEventSink::debug()))
        .build();
    let report = orchestrator.run(&context, &DryRunBackend::new()).await.map_err(|failure| {
        let states = failure
            .states()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" -> ");
        anyhow::Error::new(failure).context(format!("Deployment failed ({states})"))
    })?;

    let output = if cli.print_plan {
        report.plan.to_json_pretty()
    } else {
        serde_json::to_string_pretty(&report.summary())?
    };
    println!("{output}");
    Ok(())
}
