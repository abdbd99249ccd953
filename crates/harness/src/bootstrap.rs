use std::fs;
use std::path::Path;

use oracle::ModelConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::HarnessError;

/// Installs the global fmt subscriber. `RUST_LOG` overrides the default
/// `info` filter. Later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .try_init();
}

/// Reads a JSON model configuration. Fields left out keep their defaults.
pub fn load_model_config(path: &Path) -> Result<ModelConfig, HarnessError> {
    let text = fs::read_to_string(path).map_err(|source| HarnessError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&text);
    let config: ModelConfig =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
            HarnessError::Decode {
                path: path.to_path_buf(),
                source,
            }
        })?;
    info!(
        path = %path.display(),
        bump_frames = config.block.bump_frames,
        return_timeout = config.block.return_timeout,
        "model_config_loaded"
    );
    Ok(config)
}
