//! Configuration file discovery.

use crate::constants::CONFIG_NAMES;
use std::path::{Path, PathBuf};

/// Searches `start` and then each of its ancestors for a configuration file.
///
/// Within one directory, names are tried in [`CONFIG_NAMES`] order.
pub fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    start.ancestors().find_map(|dir| {
        CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Searches from the current working directory.
pub fn find_config_file() -> Option<PathBuf> {
    let current_dir = std::env::current_dir().ok()?;
    find_config_file_from(&current_dir)
}
