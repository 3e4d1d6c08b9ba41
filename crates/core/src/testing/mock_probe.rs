//! Mock duration probe for testing.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::probe::{DurationProbe, ProbeError};

/// Duration probe answering from a table keyed by file name.
///
/// Files not in the table fail as if the probe tool were missing.
#[derive(Debug, Clone, Default)]
pub struct MockDurationProbe {
    durations: HashMap<String, f64>,
    probed: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockDurationProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `secs` for every file named `file_name`.
    pub fn with_duration(mut self, file_name: impl Into<String>, secs: f64) -> Self {
        self.durations.insert(file_name.into(), secs);
        self
    }

    /// Paths probed so far, in call order.
    pub fn probed(&self) -> Vec<PathBuf> {
        self.probed
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DurationProbe for MockDurationProbe {
    async fn duration_secs(&self, path: &Path) -> Result<f64, ProbeError> {
        if let Ok(mut probed) = self.probed.lock() {
            probed.push(path.to_path_buf());
        }

        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.durations.get(n).copied())
            .ok_or_else(|| ProbeError::NotInstalled {
                path: PathBuf::from("mock-ffprobe"),
            })
    }
}
