//! CLI command implementations.

pub mod describe;
pub mod run;
pub mod score;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use assay::AssayConfig;
use serde_json::Value;

/// Settings from `--config`, or defaults.
fn load_settings(path: Option<&Path>) -> Result<AssayConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading settings");
            Ok(AssayConfig::load(path)?)
        }
        None => Ok(AssayConfig::default()),
    }
}

fn read_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let file = File::open(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("Failed to parse '{}': {}", path.display(), e))?;
    Ok(value)
}
