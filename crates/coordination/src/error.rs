// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

/// Identifies which backend an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// The application metadata database.
    Metadata,
    /// The storage-catalog database.
    UsageSource,
}

impl BackendKind {
    /// Returns a human-readable name for the backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::UsageSource => "usage source",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during a coordinated update operation.
///
/// Rollback failures are deliberately absent: they are logged and
/// swallowed, never surfaced, because the caller already holds the
/// primary-path outcome by the time a rollback can fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    /// A transaction could not be opened on a backend.
    Connection {
        /// The backend that refused the transaction.
        backend: BackendKind,
        /// The backend's error message.
        message: String,
    },
    /// The metadata database has no record of the requested user.
    UserNotFound(String),
    /// A query inside an open transaction failed.
    Query {
        /// The operation being attempted.
        operation: &'static str,
        /// The backend's error message.
        message: String,
    },
    /// The usage publisher reported a failed or empty write.
    UpstreamWrite {
        /// The operation being attempted.
        operation: &'static str,
        /// The publisher's error message.
        message: String,
    },
    /// A transaction commit failed.
    Commit {
        /// The backend whose commit failed.
        backend: BackendKind,
        /// The backend's error message.
        message: String,
    },
}

impl std::fmt::Display for CoordinationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { backend, message } => {
                write!(f, "error creating {backend} transaction: {message}")
            }
            Self::UserNotFound(username) => {
                write!(f, "user {username} not found in the metadata database")
            }
            Self::Query { operation, message } | Self::UpstreamWrite { operation, message } => {
                write!(f, "error {operation}: {message}")
            }
            Self::Commit { backend, message } => {
                write!(f, "error committing {backend} transaction: {message}")
            }
        }
    }
}

impl std::error::Error for CoordinationError {}
