//! Engine configuration
//!
//! Worker-pool sizing, partition granularity, history recording policy and
//! encoder defaults. Stored as JSON; every field is optional in the file and
//! falls back to its default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::io::DEFAULT_JPEG_QUALITY;
use crate::ops::filters::DEFAULT_ROWS_PER_CHUNK;

/// Which edits push a snapshot onto the history stack.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryPolicy {
    /// Only the edits the reference editor records: opening an image,
    /// grayscale-low and color correction.
    #[default]
    Reference,
    /// Every successful destructive edit.
    EveryEdit,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads for filter passes
    /// - 0 = one per logical CPU (rayon's global pool)
    pub threads: usize,

    /// Rows handed to a worker per task (>= 1)
    pub rows_per_chunk: usize,

    pub history_policy: HistoryPolicy,

    /// JPEG quality (1 to 100)
    pub jpeg_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            rows_per_chunk: DEFAULT_ROWS_PER_CHUNK,
            history_policy: HistoryPolicy::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl EngineConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows_per_chunk == 0 {
            return Err(EngineError::Config("rows_per_chunk must be at least 1".to_string()));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(EngineError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
