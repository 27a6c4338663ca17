//! The configured record source: one loader per region, file-backed or
//! HTTP-backed depending on the region's `source` entry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use larder_catalog::{CatalogError, RawRecord, RecordSource};
use larder_core::RegionsFile;

use crate::error::SourceError;
use crate::parse::parse_rows;

enum SourceSpec {
    File(PathBuf),
    Remote(String),
}

/// Record source built from the regions configuration.
///
/// File sources are read from disk on every fetch; remote sources are
/// fetched with a shared HTTP client carrying the configured timeout and
/// user agent. Caching is the catalog service's concern, not this layer's.
pub struct ConfiguredSource {
    client: reqwest::Client,
    specs: HashMap<String, SourceSpec>,
}

impl ConfiguredSource {
    /// Build a source from validated region configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the HTTP client cannot be
    /// constructed (e.g. invalid TLS config).
    pub fn from_regions(
        regions: &RegionsFile,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let specs = regions
            .regions
            .iter()
            .map(|region| {
                let spec = if region.is_remote() {
                    SourceSpec::Remote(region.source.clone())
                } else {
                    SourceSpec::File(PathBuf::from(&region.source))
                };
                (region.slug(), spec)
            })
            .collect();

        Ok(Self { client, specs })
    }

    /// Region slugs this source can serve, in no particular order.
    #[must_use]
    pub fn regions(&self) -> Vec<String> {
        self.specs.keys().cloned().collect()
    }

    /// Fetch and parse one region's rows.
    ///
    /// # Errors
    ///
    /// - [`SourceError::UnknownRegion`] — no source configured for the slug.
    /// - [`SourceError::Io`] — file source unreadable.
    /// - [`SourceError::Http`] / [`SourceError::NotFound`] /
    ///   [`SourceError::UnexpectedStatus`] — remote source failures.
    /// - [`SourceError::Csv`] — unrecoverable parse failure.
    pub async fn fetch_rows(&self, region: &str) -> Result<Vec<RawRecord>, SourceError> {
        let spec = self
            .specs
            .get(region)
            .ok_or_else(|| SourceError::UnknownRegion(region.to_string()))?;

        match spec {
            SourceSpec::File(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| SourceError::Io {
                    path: path.display().to_string(),
                    source: e,
                })?;
                parse_rows(&bytes)
            }
            SourceSpec::Remote(url) => {
                tracing::debug!(region, url, "fetching remote dataset");
                let response = self.client.get(url).send().await?;
                let status = response.status();

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(SourceError::NotFound { url: url.clone() });
                }
                if !status.is_success() {
                    return Err(SourceError::UnexpectedStatus {
                        status: status.as_u16(),
                        url: url.clone(),
                    });
                }

                let bytes = response.bytes().await?;
                parse_rows(&bytes)
            }
        }
    }
}

impl RecordSource for ConfiguredSource {
    async fn fetch(&self, region: &str) -> Result<Vec<RawRecord>, CatalogError> {
        self.fetch_rows(region).await.map_err(|e| match e {
            SourceError::UnknownRegion(r) => CatalogError::UnknownRegion(r),
            other => CatalogError::Load {
                region: region.to_string(),
                reason: other.to_string(),
            },
        })
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
