use std::fs;
use std::path::{Path, PathBuf};

use super::SatdConfig;
use crate::errors::{Result, SatdError};

pub const CONFIG_FILE_NAME: &str = ".satdmap.toml";

/// How many ancestor directories are searched for a config file.
pub const MAX_SEARCH_DEPTH: usize = 10;

/// Pure function to parse and validate config from TOML string
pub fn parse_and_validate_config(contents: &str) -> Result<SatdConfig> {
    let config = toml::from_str::<SatdConfig>(contents)
        .map_err(|e| SatdError::config(format!("Failed to parse {CONFIG_FILE_NAME}: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load and validate a specific config file.
pub fn load_config_from_path(config_path: &Path) -> Result<SatdConfig> {
    let contents = fs::read_to_string(config_path)?;
    let config = parse_and_validate_config(&contents)?;
    log::debug!("Loaded config from {}", config_path.display());
    Ok(config)
}

/// Find `.satdmap.toml` in `start` or its ancestors and load it.
///
/// A missing file yields the default configuration; a file that exists but
/// is unreadable or invalid is an error.
pub fn load_config(start: &Path) -> Result<SatdConfig> {
    let found = directory_ancestors(start.to_path_buf(), MAX_SEARCH_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file());

    match found {
        Some(path) => load_config_from_path(&path),
        None => {
            log::debug!(
                "No {} found above {}; using defaults",
                CONFIG_FILE_NAME,
                start.display()
            );
            Ok(SatdConfig::default())
        }
    }
}

/// Pure function to generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| dir.parent().map(Path::to_path_buf)).take(max_depth)
}
