// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Collaborator contracts consumed by the coordinator.
//!
//! The metadata database, the storage-catalog database, and the usage
//! publisher are all external to this repository. The coordinator only
//! sees them through the traits defined here, which mirror the shape of
//! the real accessors: transactional backends that hand out one
//! transaction per `begin`, and a publisher that performs the
//! authoritative write-through.
//!
//! All trait methods are futures; callers cancel an in-flight operation
//! by dropping the future, which is also how deadline enforcement is
//! expected to work. No timeouts are imposed here.

use std::collections::{BTreeMap, HashMap};

use data_usage_domain::{CanonicalUsername, Config, UserDataUsage, UserInfo};

/// Errors reported by backends and the publisher.
///
/// `NoRows` and `AlreadyFinalized` are sentinels the coordinator
/// inspects; everything else is opaque and gets wrapped with operation
/// context before it reaches callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The query or write matched no rows.
    NoRows,
    /// The transaction was already committed or rolled back.
    AlreadyFinalized,
    /// The backend could not be reached or refused to begin a transaction.
    Unavailable(String),
    /// A query inside an open transaction failed.
    Query(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoRows => write!(f, "no rows in result set"),
            Self::AlreadyFinalized => {
                write!(f, "transaction has already been committed or rolled back")
            }
            Self::Unavailable(msg) => write!(f, "backend unavailable: {msg}"),
            Self::Query(msg) => write!(f, "query failed: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// A live backend transaction that can be finalized exactly once.
///
/// Both finalizers consume the handle; the type system rules out
/// finalizing the same underlying transaction twice. Idempotent
/// re-finalization at the coordinator level is provided by the slot
/// that owns the handle, not by the handle itself.
pub trait TxHandle {
    /// Commits the transaction.
    async fn commit(self) -> Result<(), BackendError>;

    /// Rolls the transaction back.
    ///
    /// Backends may report [`BackendError::AlreadyFinalized`] when the
    /// transaction was finalized out from under the caller; the
    /// coordinator recognizes and swallows that condition.
    async fn rollback(self) -> Result<(), BackendError>;
}

/// The application metadata database: user identity and synchronized
/// usage records.
pub trait MetadataBackend {
    /// The transaction type handed out by [`MetadataBackend::begin`].
    type Tx: MetadataTx;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx, BackendError>;
}

/// Operations available inside a metadata transaction.
pub trait MetadataTx: TxHandle {
    /// Looks up a user's identity by username.
    ///
    /// Returns [`BackendError::NoRows`] when the user is unknown.
    async fn get_user_info(&mut self, username: &str) -> Result<UserInfo, BackendError>;

    /// Ensures a row exists for every given canonical username.
    ///
    /// Idempotent: usernames that already exist are left untouched and
    /// do not error.
    async fn ensure_users(&mut self, usernames: &[CanonicalUsername])
    -> Result<(), BackendError>;
}

/// The storage-catalog database: the authoritative source of per-user
/// aggregate data usage. Read-mostly.
pub trait UsageSourceBackend {
    /// The transaction type handed out by [`UsageSourceBackend::begin`].
    type Tx: UsageSourceTx;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx, BackendError>;
}

/// Operations available inside a usage-source transaction.
pub trait UsageSourceTx: TxHandle {
    /// Returns the current aggregate data usage for one user, in bytes.
    ///
    /// Returns [`BackendError::NoRows`] for users with no tracked
    /// storage; callers treat that as a valid zero-usage state.
    async fn user_current_data_usage(&mut self, username: &str) -> Result<i64, BackendError>;

    /// Returns aggregate usage for all raw usernames in the half-open
    /// lexical range `[start, end)`.
    ///
    /// Which users appear, including explicit zero readings for in-range
    /// users without usage rows, is the query's own contract.
    async fn batch_current_data_usage(
        &mut self,
        start: &str,
        end: &str,
    ) -> Result<HashMap<String, i64>, BackendError>;
}

/// The downstream write-through-and-publish step.
pub trait UsagePublisher {
    /// Writes one user's usage reading and publishes the result.
    ///
    /// Returns [`BackendError::NoRows`] when the write affected no rows,
    /// which callers must treat as a hard failure: the write target
    /// could not be found.
    async fn update_usage_for_user(
        &self,
        config: &Config,
        username: &str,
        usage: f64,
    ) -> Result<UserDataUsage, BackendError>;

    /// Writes and publishes a batch of usage readings keyed by
    /// canonical username.
    async fn add_user_updates_batch(
        &self,
        config: &Config,
        usages: &BTreeMap<CanonicalUsername, f64>,
    ) -> Result<Vec<UserDataUsage>, BackendError>;
}
