use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Subfolder created under the destination by `merge` when no name is given.
    pub default_folder_name: String,
    /// Archive file name used by `compress` when no name is given.
    pub default_archive_name: String,
    pub history_path: PathBuf,
    pub ignore_patterns: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_folder_name: "Consolidated".to_string(),
            default_archive_name: "Compressed.zip".to_string(),
            history_path: PathBuf::from("consolidation_history.json"),
            ignore_patterns: Vec::new(),
        }
    }
}

/// Load `Config.toml` (optional) overlaid with `CONSOLIDATOR_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("CONSOLIDATOR")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Returns the first path in `paths` that contains `other` or is contained by it.
///
/// Paths are compared component-wise, so `/data/photos2` does not overlap `/data/photos`.
pub fn find_overlap<'a>(paths: &'a [PathBuf], other: &Path) -> Option<&'a Path> {
    paths
        .iter()
        .map(|p| p.as_path())
        .find(|p| other.starts_with(p) || p.starts_with(other))
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !kept.starts_with(&dir));
        result.push(dir);
    }

    result
}
