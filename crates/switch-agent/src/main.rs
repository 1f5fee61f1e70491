use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use application::{ConnectionManager, LinkOptions, StatusTracker};
use domain::TargetAddress;
use infrastructure::{ControllerConfig, SimulatorConfig, TransportConfig, TransportFactory};
use switch_agent::{Action, Agent, Args, send_once, summarize};

/// How long a one-shot command waits for the device to answer
const REPLY_WINDOW: Duration = Duration::from_millis(1500);

async fn run() -> Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,switch_agent=debug,application=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Run from the workspace root during development, from the install dir otherwise
    let dev_base = "crates/switch-agent";
    let base_dir = if std::path::Path::new(dev_base).exists() {
        dev_base
    } else {
        "."
    };
    let config_dir = args
        .config_dir
        .clone()
        .unwrap_or_else(|| format!("{}/config", base_dir));

    info!("📂 Config directory: {}", config_dir);
    let mut config = ControllerConfig::load(&config_dir)
        .with_context(|| format!("loading configuration from {config_dir}"))?;

    // CLI overrides
    if let Some(address) = args.address.clone() {
        config.device.address = Some(address);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.device.connect_timeout_ms = timeout_ms;
    }
    if args.simulate {
        config.transport = TransportConfig::Simulator(SimulatorConfig {
            addresses: Vec::new(),
            ..Default::default()
        });
    }

    let address = config
        .device
        .address
        .clone()
        .context("no device address configured (set device.address or pass --address)")?;
    let address = TargetAddress::new(address)?;

    info!(
        transport = config.transport.kind(),
        address = %address,
        "✅ Configuration loaded"
    );

    let transport = TransportFactory::create(&config.transport);
    let link = Arc::new(ConnectionManager::new(
        transport,
        LinkOptions {
            read_buffer_size: config.link.read_buffer_size,
            connect_timeout: config.connect_timeout(),
        },
    ));

    match args.action.unwrap_or(Action::Run) {
        Action::Run => {
            let tracker = StatusTracker::new(config.status.policy);
            let agent = Agent::new(
                link.clone(),
                address,
                tracker,
                config.status.poll_interval(),
            );

            let cancel = CancellationToken::new();
            let shutdown = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("🛑 Shutting down..."),
                    Err(err) => warn!(error = %err, "Unable to listen for shutdown signal"),
                }
                shutdown.cancel();
            });

            agent.run(cancel).await?;
        }
        action => {
            // Every non-run action maps to exactly one command
            let command = action
                .command()
                .context("action does not send a command")?;
            let replies = send_once(&link, address, &command, REPLY_WINDOW).await?;

            if action == Action::Status {
                let status = summarize(&replies);
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                for reply in &replies {
                    print!("{reply}");
                }
            }
        }
    }

    info!("👋 Good bye!");
    Ok(())
}

fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("❌ Failed to start runtime: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("\n❌ CRITICAL ERROR: {:?}", e);
        std::process::exit(1);
    }
}
