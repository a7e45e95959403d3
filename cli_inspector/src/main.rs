use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};

use clap::Parser;
use client_core::{
    load_client_config, run_channel, ApiClient, ChannelEvent, ClientConfig, Command,
    CommandOutcome,
};
use color_eyre::Result;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tracing::{debug, info};

mod app;
mod ui;

use app::InspectorApp;

#[derive(Clone)]
struct ChannelWriter {
    sender: Sender<String>,
}

impl std::io::Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(text) = String::from_utf8(buf.to_vec()) {
            let _ = self.sender.send(text);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Terminal dashboard for the campus simulation", long_about = None)]
struct Cli {
    /// Root URL of the simulation service. Overrides the config file.
    #[arg(long)]
    base_url: Option<String>,
    /// JSON client config. Defaults to $CAMPUS_CLIENT_CONFIG, then built-ins.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => load_client_config()?,
    };
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
        config.validate()?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let (log_tx, log_rx) = mpsc::channel::<String>();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(move || ChannelWriter {
            sender: log_tx.clone(),
        })
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let api = ApiClient::new(config.api_base(), config.request_timeout())?;
    info!(base_url = %config.api_base(), channel = %config.channel_url(), "inspector.starting");

    let (channel_tx, channel_rx) = unbounded_channel::<ChannelEvent>();
    let (command_tx, command_rx) = unbounded_channel::<Command>();
    let (outcome_tx, outcome_rx) = unbounded_channel::<CommandOutcome>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let channel_task = tokio::spawn(run_channel(
        config.channel_url(),
        config.reconnect_delay(),
        channel_tx,
        shutdown_rx,
    ));
    let command_task = tokio::spawn(run_command_pump(api, command_rx, outcome_tx));

    let ui_result = tokio::task::spawn_blocking(move || -> Result<()> {
        let app = InspectorApp::new(&config, channel_rx, command_tx, outcome_rx, log_rx)?;
        app.run()
    })
    .await?;

    info!("Inspector requested shutdown");
    let _ = shutdown_tx.send(true);
    let _ = channel_task.await;
    let _ = command_task.await;
    ui_result
}

/// Execute commands concurrently; each outcome is reported back to the UI
/// loop as soon as it completes.
async fn run_command_pump(
    api: ApiClient,
    mut commands: UnboundedReceiver<Command>,
    outcomes: UnboundedSender<CommandOutcome>,
) {
    while let Some(command) = commands.recv().await {
        let api = api.clone();
        let outcomes = outcomes.clone();
        tokio::spawn(async move {
            let result = api.execute(&command).await;
            debug!(command = command.name(), ok = result.is_ok(), "command.completed");
            let _ = outcomes.send(CommandOutcome { command, result });
        });
    }
}
