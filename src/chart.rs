// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Helm repository index lookup

use crate::constants::gitlab::CHART_INDEX_PATH;
use crate::error::{ProvisionError, Result};
use semver::Version;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use url::Url;

/// The parts of a Helm repository `index.yaml` we care about
#[derive(Deserialize, Debug)]
pub struct ChartIndex {
    #[serde(default)]
    pub entries: HashMap<String, Vec<ChartEntry>>,
}

#[derive(Deserialize, Debug)]
pub struct ChartEntry {
    pub version: String,
}

impl ChartIndex {
    pub fn parse(document: &str) -> Result<Self> {
        serde_yaml::from_str(document)
            .map_err(|e| ProvisionError::RemoteIndex(format!("invalid index document: {}", e)))
    }

    /// Highest semantic version published for `chart`; entries that are not
    /// valid semver are ignored
    pub fn latest_version(&self, chart: &str) -> Option<Version> {
        self.entries
            .get(chart)?
            .iter()
            .filter_map(|entry| parse_version(&entry.version))
            .max()
    }
}

fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()
}

/// URL of the index document of a chart repository
pub fn index_url(repository: &str) -> Result<Url> {
    let base = if repository.ends_with('/') {
        repository.to_string()
    } else {
        format!("{}/", repository)
    };

    Url::parse(&base)
        .and_then(|u| u.join(CHART_INDEX_PATH))
        .map_err(|e| ProvisionError::RemoteIndex(format!("invalid repository URL {}: {}", repository, e)))
}

pub struct ChartVersionResolver {
    http: reqwest::Client,
}

impl ChartVersionResolver {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the repository index and return the newest version of `chart`
    #[instrument(skip(self))]
    pub async fn latest_version(&self, repository: &str, chart: &str) -> Result<String> {
        let url = index_url(repository)?;
        debug!("Fetching chart index {}", url);

        let document = self
            .http
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProvisionError::RemoteIndex(format!("GET {}: {}", url, e)))?
            .text()
            .await
            .map_err(|e| ProvisionError::RemoteIndex(format!("reading {}: {}", url, e)))?;

        let version = ChartIndex::parse(&document)?
            .latest_version(chart)
            .ok_or_else(|| ProvisionError::ChartNotFound {
                chart: chart.to_string(),
                index_url: url.to_string(),
            })?;

        info!("Latest version of chart '{}' is {}", chart, version);
        Ok(version.to_string())
    }
}

impl Default for ChartVersionResolver {
    fn default() -> Self {
        Self::new()
    }
}
