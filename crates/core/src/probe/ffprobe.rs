//! `ffprobe`-backed duration probe.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::config::ProbeConfig;

use super::{DurationProbe, ProbeError};

/// Runs `ffprobe -v error -show_entries format=duration -of json <file>`.
pub struct FfprobeDurationProbe {
    config: ProbeConfig,
    missing_reported: AtomicBool,
}

impl FfprobeDurationProbe {
    pub fn new(config: ProbeConfig) -> Self {
        Self {
            config,
            missing_reported: AtomicBool::new(false),
        }
    }

    /// Parse the `format.duration` field of ffprobe's JSON output.
    fn parse_output(path: &Path, stdout: &str) -> Result<f64, ProbeError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: Option<ProbeFormat>,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        let failed = |reason: String| ProbeError::Failed {
            path: path.to_path_buf(),
            reason,
        };

        let probe: ProbeOutput = serde_json::from_str(stdout)
            .map_err(|e| failed(format!("unparseable ffprobe output: {e}")))?;

        probe
            .format
            .and_then(|f| f.duration)
            .and_then(|d| d.trim().parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d >= 0.0)
            .ok_or_else(|| failed("no duration reported".to_string()))
    }

    fn report_missing(&self) {
        if !self.missing_reported.swap(true, Ordering::Relaxed) {
            warn!(
                path = %self.config.ffprobe_path.display(),
                "ffprobe is not installed; movie detection is disabled and every file will be classified by name"
            );
        }
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn duration_secs(&self, path: &Path) -> Result<f64, ProbeError> {
        let mut command = Command::new(&self.config.ffprobe_path);
        command
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "json",
            ])
            .arg(path)
            .kill_on_drop(true);

        let timeout_secs = self.config.timeout_secs;
        let output = match timeout(Duration::from_secs(timeout_secs), command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                self.report_missing();
                return Err(ProbeError::NotInstalled {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            Ok(Err(e)) => return Err(ProbeError::Io(e)),
            Err(_) => {
                return Err(ProbeError::Timeout {
                    path: path.to_path_buf(),
                    timeout_secs,
                })
            }
        };

        if !output.status.success() {
            return Err(ProbeError::Failed {
                path: path.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let duration = Self::parse_output(path, &String::from_utf8_lossy(&output.stdout))?;
        debug!(path = %path.display(), duration, "Probed duration");
        Ok(duration)
    }
}
