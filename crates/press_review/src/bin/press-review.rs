use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;
use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use clap::{Parser, Subcommand};
use cron::Schedule;
use press_review::{
    config::{Settings, SettingsArgs},
    server,
    tracing::init_tracing_subscriber,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[derive(Parser)]
#[command(
    name = "press-review",
    about = "Summarizes new YouTube videos and posts them to Telegram"
)]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the channels once and exit
    Run,
    /// Serve an HTTP endpoint that runs the check on every GET /
    Serve {
        /// Address to listen on
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: std::net::IpAddr,

        /// Port to listen on
        #[arg(long, env = "PORT", default_value = "8080")]
        port: u16,
    },
    /// Start the cron scheduler
    Cron {
        /// Cron schedule expression
        #[arg(long, env = "CRON_SCHEDULE", default_value = "0 0 */6 * * *")]
        schedule: String,
    },
}

async fn run_pipeline(settings: &Settings) -> anyhow::Result<()> {
    let processor = settings.build_processor()?;
    let report = processor.run().await?;

    tracing::info!(
        notified = report.videos_notified,
        failed = report.videos_failed,
        "Pipeline run complete"
    );
    Ok(())
}

async fn handle_tick(_tick: Tick, settings: Data<Settings>) -> anyhow::Result<()> {
    tracing::info!(
        channels = settings.channel_ids.len(),
        "Running scheduled pipeline..."
    );
    run_pipeline(&settings).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let settings = Settings::try_from(cli.settings).context("Invalid configuration")?;
    if settings.channel_ids.is_empty() {
        tracing::warn!("YOUTUBE_CHANNEL_IDS is empty, there is nothing to check");
    }
    tracing::debug!(?settings, "Loaded settings");

    match cli.command {
        Command::Run => {
            tracing::info!(
                channels = settings.channel_ids.len(),
                "Running pipeline once..."
            );
            run_pipeline(&settings).await?;
        }
        Command::Serve { host, port } => {
            let processor = settings.build_processor()?;
            let addr = SocketAddr::new(host, port);
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;

            let shutdown = CancellationToken::new();
            tokio::spawn(server::cancel_on_signal(shutdown.clone()));

            let runs = TaskTracker::new();
            let router = server::router(processor, runs.clone());
            server::serve(listener, router, shutdown, runs).await?;
        }
        Command::Cron { schedule } => {
            tracing::info!(%schedule, "Starting cron scheduler...");
            let schedule = Schedule::from_str(&schedule)?;

            let worker = WorkerBuilder::new("press-review-cron")
                .backend(CronStream::new(schedule))
                .retry(RetryPolicy::retries(3))
                .layer(SentryLayer::new())
                .data(settings)
                .build(handle_tick);

            worker.run().await?;
        }
    }

    Ok(())
}
