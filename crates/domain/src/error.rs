// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required configuration field is missing or empty.
    MissingField(&'static str),
    /// The refresh interval must be a positive number of seconds.
    InvalidRefreshInterval,
    /// The configuration document could not be parsed.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} must be set"),
            Self::InvalidRefreshInterval => {
                write!(f, "refresh_interval_seconds must be greater than zero")
            }
            Self::Parse(msg) => write!(f, "invalid configuration document: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}
