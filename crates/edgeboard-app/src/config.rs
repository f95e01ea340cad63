//! Application configuration, loaded from JSON.

use anyhow::{Context, Result};
use edgeboard_core::{OverflowPolicy, UartConfig};
use edgeboard_impulse::{Classification, ImpulseResult, ModelInfo, OutputKind, Predictions, Timing};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Serial device, e.g. `/dev/ttyACM0`. Empty runs without a board.
    pub port_name: String,
    /// Run against the in-memory channel even when a port is named.
    pub offline: bool,
    pub use_max_baud: bool,
    /// Unset waits for transmit completion forever.
    pub write_timeout_ms: Option<u64>,
    /// Raise the transport error flag when received bytes are dropped.
    pub flag_rx_overflow: bool,
    /// Pause between inferences.
    pub interval_ms: u64,
    pub max_iterations: Option<u64>,
    /// Also print the console output on stdout.
    pub mirror_stdout: bool,
    /// Raw features, e.g. copied from a live classification page.
    pub features: Vec<f32>,
    pub model: ModelInfo,
    /// Result the replay classifier answers with.
    pub replay: ImpulseResult,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            offline: false,
            use_max_baud: false,
            write_timeout_ms: None,
            flag_rx_overflow: false,
            interval_ms: 2000,
            max_iterations: None,
            mirror_stdout: true,
            features: vec![0.0, 0.25, 0.5, 0.75],
            model: ModelInfo {
                name: "demo".to_string(),
                input_frame_size: 4,
                labels: vec!["idle".to_string(), "active".to_string()],
                output: OutputKind::Classification,
                has_anomaly: false,
            },
            replay: ImpulseResult {
                timing: Timing::default(),
                predictions: Predictions::Classification(vec![
                    Classification {
                        label: "idle".to_string(),
                        value: 0.9,
                    },
                    Classification {
                        label: "active".to_string(),
                        value: 0.1,
                    },
                ]),
                anomaly: None,
            },
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from the per-user config file when no path is
    /// given. A missing per-user file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => {
                    log::info!("no config file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("loaded config {}", path.display());
        Ok(cfg)
    }

    pub fn is_offline(&self) -> bool {
        self.offline || self.port_name.is_empty()
    }

    pub fn uart(&self) -> UartConfig {
        UartConfig {
            port_name: self.port_name.clone(),
            write_timeout: self.write_timeout_ms.map(Duration::from_millis),
            overflow: if self.flag_rx_overflow {
                OverflowPolicy::Flag
            } else {
                OverflowPolicy::Drop
            },
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("edgeboard").join("config.json"))
}
