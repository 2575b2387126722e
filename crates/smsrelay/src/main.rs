mod cli;
mod config;
mod error;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use smsrelay_api::MqttTransport;
use smsrelay_core::{CommandSink, LogSink, NotificationSink, Pipeline, Supervisor};

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise the resolved `--log-level`.
fn init_tracing(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let file_config = match cli.config.as_deref() {
        Some(path) => smsrelay_config::load_config_from(path)?,
        None => smsrelay_config::load_config()?,
    };
    let settings = config::resolve_settings(&cli, &file_config)?;

    init_tracing(settings.log_level);

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let sink: Box<dyn NotificationSink> = match settings
        .notify_command
        .as_deref()
        .and_then(CommandSink::from_command_line)
    {
        Some(command) => {
            tracing::debug!(program = command.program(), "Using external notifier");
            Box::new(command)
        }
        None => Box::new(LogSink),
    };

    let relay = settings.relay;
    tracing::info!(
        endpoint = %relay.connect.endpoint(),
        topics = %relay.topics.join(", "),
        qos = %relay.qos,
        "Starting MQTT subscriber"
    );

    let mut pipeline = Pipeline::new(relay.pipeline, sink, std::io::stdout());
    let mut supervisor = Supervisor::new(MqttTransport, &relay, cancel);
    let report = supervisor.run(&mut pipeline).await?;

    tracing::info!(
        sessions = report.sessions,
        reconnects = report.reconnects,
        messages = report.messages,
        "Subscriber stopped"
    );
    Ok(())
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Interrupt received, shutting down");
                cancel.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "Failed to listen for Ctrl-C"),
        }
    });
}
