// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::error::ConfigError;

/// Runtime configuration for the synchronization service.
///
/// The structure is read-only once loaded. [`Config::validate`] must
/// succeed before a coordinator is constructed; every required field is
/// rejected when empty so misconfiguration fails at startup rather than
/// mid-operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Connection URI for the metadata database.
    pub metadata_uri: String,
    /// Schema name within the metadata database.
    pub metadata_schema: String,
    /// Connection URI for the storage-catalog database.
    pub usage_source_uri: String,
    /// The storage zone usage is aggregated over.
    pub zone: String,
    /// Names of the root resources included in usage aggregation.
    pub root_resource_names: Vec<String>,
    /// Domain suffix appended to raw usernames during canonicalization.
    pub user_suffix: String,
    /// How often the periodic batch refresh runs, in seconds.
    pub refresh_interval_seconds: u64,
}

impl Config {
    /// Parses a configuration document from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or if any
    /// required field is missing or empty.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every required field is populated.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first field that is missing or empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metadata_uri.is_empty() {
            return Err(ConfigError::MissingField("metadata_uri"));
        }

        if self.metadata_schema.is_empty() {
            return Err(ConfigError::MissingField("metadata_schema"));
        }

        if self.usage_source_uri.is_empty() {
            return Err(ConfigError::MissingField("usage_source_uri"));
        }

        if self.zone.is_empty() {
            return Err(ConfigError::MissingField("zone"));
        }

        if self.root_resource_names.is_empty() {
            return Err(ConfigError::MissingField("root_resource_names"));
        }

        if self.user_suffix.is_empty() {
            return Err(ConfigError::MissingField("user_suffix"));
        }

        if self.refresh_interval_seconds == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }

        Ok(())
    }

    /// Returns the refresh interval as a [`Duration`].
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::seconds(i64::try_from(self.refresh_interval_seconds).unwrap_or(i64::MAX))
    }
}
