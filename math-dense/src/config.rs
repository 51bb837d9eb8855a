//! JSON configuration for the dense matrix core

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime configuration shared by every matrix created in a context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseConfig {
    /// Route unsafe in-place writes through a temporary instead of failing
    #[serde(default = "default_fix_unsafe_overlaps")]
    pub fix_unsafe_overlaps: bool,
    /// Largest row count a single allocation may request
    #[serde(default = "default_max_extent")]
    pub max_rows: usize,
    /// Largest column count a single allocation may request
    #[serde(default = "default_max_extent")]
    pub max_cols: usize,
    /// Iterative refinement
    #[serde(default)]
    pub refine: RefineConfig,
}

fn default_fix_unsafe_overlaps() -> bool {
    true
}

fn default_max_extent() -> usize {
    1024
}

impl Default for DenseConfig {
    fn default() -> Self {
        Self {
            fix_unsafe_overlaps: default_fix_unsafe_overlaps(),
            max_rows: default_max_extent(),
            max_cols: default_max_extent(),
            refine: RefineConfig::default(),
        }
    }
}

/// Iterative refinement configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Maximum number of refinement steps
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Converged once the residual falls below this fraction of the L1 norm of `B`
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Print progress every N iterations (0 = no output)
    #[serde(default)]
    pub print_interval: usize,
}

fn default_max_iterations() -> usize {
    10
}

fn default_tolerance() -> f64 {
    1e-12
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            print_interval: 0,
        }
    }
}

impl DenseConfig {
    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse JSON: {}", e))
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents =
            fs::read_to_string(path).map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_json(&contents)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Failed to write config file: {}", e))
    }
}
