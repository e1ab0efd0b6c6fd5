//! modemctl
//!
//! Command line front end for the cellular modem orchestrator.
//!
//! - `ports`: list serial ports, likely modems first
//! - `probe`: wake a modem with `AT` and read its identity and signal
//! - `simulate`: run bring-up/tear-down cycles against a simulated modem
//! - `config`: show, initialise or locate the settings file

mod error;
mod ports;
mod probe;
mod settings;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use modem_cellular::{ModemConfig, ModemState, SignalType};
use modem_sim::{Completion, SimModem, SimModemOptions};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::settings::Settings;

/// Cellular modem bring-up tool.
#[derive(Parser, Debug)]
#[command(name = "modemctl", version, about = "Cellular modem bring-up tool")]
struct Cli {
    /// Settings file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports.
    Ports,

    /// Probe a serial port for a modem.
    Probe {
        /// Serial port (defaults to the configured port).
        #[arg(long)]
        port: Option<String>,

        /// Baud rate (defaults to the configured rate).
        #[arg(long)]
        baud: Option<u32>,
    },

    /// Run bring-up/tear-down cycles against a simulated modem.
    Simulate {
        /// Number of cycles.
        #[arg(long, default_value_t = 1)]
        cycles: u32,

        /// Simulate a modem without a power key line.
        #[arg(long, default_value_t = false)]
        no_power_line: bool,

        /// Simulate a modem without a reset line.
        #[arg(long, default_value_t = false)]
        no_reset_line: bool,

        /// Delay before each simulated completion, in milliseconds.
        #[arg(long)]
        latency_ms: Option<u64>,

        /// Shorten power timings to a few hundred milliseconds.
        #[arg(long, default_value_t = false)]
        fast: bool,
    },

    /// Manage the settings file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective settings as JSON.
    Show,
    /// Write default settings.
    Init {
        /// Overwrite an existing settings file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print the settings file path.
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "modemctl=info,modem_cellular=info,modem_chat=info,modem_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings_path = match &cli.config {
        Some(path) => path.clone(),
        None => Settings::settings_path().context("could not determine settings path")?,
    };

    match cli.command {
        Command::Ports => list_ports(),
        Command::Probe { port, baud } => {
            let settings = load_settings(&settings_path)?;
            let port = port.unwrap_or(settings.port);
            anyhow::ensure!(!port.is_empty(), "no port given and none configured");
            run_probe(&port, baud.unwrap_or(settings.baud_rate)).await
        }
        Command::Simulate {
            cycles,
            no_power_line,
            no_reset_line,
            latency_ms,
            fast,
        } => {
            let settings = load_settings(&settings_path)?;
            let mut options = settings.simulation;
            options.power_line &= !no_power_line;
            options.reset_line &= !no_reset_line;
            if let Some(ms) = latency_ms {
                options.completion = Completion::Delayed(Duration::from_millis(ms));
            }
            let mut config = settings.modem_config();
            if fast {
                shorten_timings(&mut config);
            }
            simulate(config, options, cycles).await
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let settings = load_settings(&settings_path)?;
                println!("{}", serde_json::to_string_pretty(&settings)?);
                Ok(())
            }
            ConfigAction::Init { force } => {
                anyhow::ensure!(
                    force || !settings_path.exists(),
                    "{} already exists (use --force to overwrite)",
                    settings_path.display()
                );
                Settings::default().save_to(&settings_path)?;
                println!("wrote {}", settings_path.display());
                Ok(())
            }
            ConfigAction::Path => {
                println!("{}", settings_path.display());
                Ok(())
            }
        },
    }
}

fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    if !path.exists() {
        info!("no settings at {}, using defaults", path.display());
        return Ok(Settings::default());
    }
    Ok(Settings::load_from(path.to_path_buf())?)
}

fn list_ports() -> anyhow::Result<()> {
    let ports = ports::enumerate_ports()?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for port in ports {
        let product = port.product.as_deref().unwrap_or("-");
        match port.modem_vendor {
            Some(vendor) => println!("{:<24} {} ({} modem)", port.port, product, vendor),
            None => println!("{:<24} {}", port.port, product),
        }
    }
    Ok(())
}

async fn run_probe(port: &str, baud_rate: u32) -> anyhow::Result<()> {
    info!("probing {} at {} baud", port, baud_rate);
    let result = probe::probe(port, baud_rate, &probe::ProbeConfig::default()).await?;
    println!("{}", serde_json::to_string_pretty(&result.info)?);
    for (script, outcome) in &result.failed {
        warn!("{} on {}: {}", script, result.port, outcome);
    }
    Ok(())
}

fn shorten_timings(config: &mut ModemConfig) {
    config.power_pulse_ms = config.power_pulse_ms.min(100);
    config.reset_pulse_ms = config.reset_pulse_ms.min(50);
    config.startup_time_ms = config.startup_time_ms.min(300);
    config.shutdown_time_ms = config.shutdown_time_ms.min(300);
}

async fn simulate(config: ModemConfig, options: SimModemOptions, cycles: u32) -> anyhow::Result<()> {
    let bring_up_bound = Duration::from_millis(
        config.power_pulse_ms + config.startup_time_ms + config.suspend_timeout_ms,
    );
    let sim = SimModem::spawn(config, options);

    let mut states = sim.modem.subscribe();
    let watcher = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = *states.borrow_and_update();
            info!("state {}", state);
        }
    });

    for cycle in 1..=cycles {
        info!("cycle {} of {}", cycle, cycles);
        sim.modem.resume();
        sim.modem
            .wait_for_state(ModemState::CarrierOn, bring_up_bound)
            .await
            .context("bring-up did not reach carrier")?;

        println!("{}", serde_json::to_string_pretty(&sim.modem.info())?);
        for kind in [SignalType::Rssi, SignalType::Rsrp, SignalType::Rsrq] {
            match sim.modem.get_signal(kind).await {
                Ok(value) => println!("{}: {}", kind, value),
                Err(e) => println!("{}: {}", kind, e),
            }
        }

        sim.modem.suspend().await?;
    }

    if sim.modem.dropped_events() > 0 {
        warn!("{} events dropped", sim.modem.dropped_events());
    }
    sim.shutdown().await;
    watcher.abort();
    Ok(())
}
