mod config;
mod logging;
mod pump;

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use portbridge_protocol::ProtocolEngine;
use portbridge_serial::{DeviceNotifier, UnixSerialDriver};

use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "portbridge",
    version,
    about = "Native messaging host bridging a browser extension to serial devices"
)]
struct Cli {
    /// Configuration file (defaults to <executable>.json).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", env = "PORTBRIDGE_LOG")]
    log_level: LogLevel,
}

#[derive(Debug, thiserror::Error)]
enum HostError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("failed to start stdin reader: {0}")]
    StdinReader(std::io::Error),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), HostError> {
    let config_path = cli.config.unwrap_or_else(config::default_path);
    let config = config::Config::load(&config_path)?;
    info!(
        path = %config_path.display(),
        ports = config.serial_ports.len(),
        "configuration loaded"
    );

    let (tx, rx) = mpsc::channel();

    let notifier: DeviceNotifier = {
        let tx = tx.clone();
        Arc::new(move |event| {
            let _ = tx.send(pump::Event::Device(event));
        })
    };
    let driver = UnixSerialDriver::new(config.serial_ports, notifier);
    let mut engine = ProtocolEngine::new(driver);

    pump::spawn_stdin_reader(tx.clone()).map_err(HostError::StdinReader)?;
    {
        let tx = tx.clone();
        ctrlc::set_handler(move || {
            let _ = tx.send(pump::Event::Shutdown);
        })?;
    }

    let mut sink = pump::stdout_sink();
    pump::run(&mut engine, rx, &mut sink);

    engine.driver_mut().close_all();
    info!("exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_flag() {
        let cli = Cli::try_parse_from(["portbridge", "--config", "/etc/portbridge.json"])
            .expect("config flag should parse");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/portbridge.json")));
    }

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["portbridge"]).expect("bare invocation should parse");
        assert!(cli.config.is_none());
        assert!(matches!(cli.log_format, LogFormat::Text));
        assert!(matches!(cli.log_level, LogLevel::Info));
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert!(Cli::try_parse_from(["portbridge", "--log-format", "xml"]).is_err());
    }
}
