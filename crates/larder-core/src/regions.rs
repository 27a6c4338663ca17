use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One region entry from the regions configuration file.
///
/// `source` is either a filesystem path or an `http(s)://` URL to the
/// region's delimited-text dataset; the record source layer decides which
/// loader to use based on the scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub source: String,
    pub notes: Option<String>,
}

impl RegionConfig {
    /// Generate a stable region identifier from the display name.
    ///
    /// Lowercased, non-alphanumeric characters stripped, runs of spaces
    /// collapsed to a single underscore: `"Greater Manchester"` →
    /// `"greater_manchester"`.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' {
                    c
                } else if c == ' ' || c == '-' {
                    ' '
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Whether this region's dataset is fetched over HTTP rather than
    /// read from disk.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.source.starts_with("http://") || self.source.starts_with("https://")
    }
}

#[derive(Debug, Deserialize)]
pub struct RegionsFile {
    pub regions: Vec<RegionConfig>,
}

/// Load and validate the regions configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_regions(path: &Path) -> Result<RegionsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RegionsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let regions_file: RegionsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::RegionsFileParse)?;

    validate_regions(&regions_file)?;

    Ok(regions_file)
}

fn validate_regions(regions_file: &RegionsFile) -> Result<(), ConfigError> {
    if regions_file.regions.is_empty() {
        return Err(ConfigError::Validation(
            "at least one region must be configured".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    let mut seen_slugs = HashSet::new();

    for region in &regions_file.regions {
        if region.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "region name must be non-empty".to_string(),
            ));
        }

        if region.source.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "region '{}' has an empty source",
                region.name
            )));
        }

        let lower_name = region.name.to_lowercase();
        if !seen_names.insert(lower_name) {
            return Err(ConfigError::Validation(format!(
                "duplicate region name: '{}'",
                region.name
            )));
        }

        let slug = region.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "region '{}' produces an empty slug",
                region.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate region slug: '{slug}' (from region '{}')",
                region.name
            )));
        }
    }

    Ok(())
}
