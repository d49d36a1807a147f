use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Host configuration.
///
/// The advertised serial ports are listed explicitly instead of scanned:
/// the host runs with the browser's privileges and only exposes devices
/// the operator opted in.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub serial_ports: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;
        serde_json::from_slice(&raw).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            source: err,
        })
    }
}

/// Default config location: `<executable>.json` next to the binary, the
/// same convention the native messaging manifest uses for the host itself.
pub fn default_path() -> PathBuf {
    match std::env::current_exe() {
        Ok(exe) => {
            let mut os = exe.into_os_string();
            os.push(".json");
            PathBuf::from(os)
        }
        Err(_) => PathBuf::from("portbridge.json"),
    }
}
