// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Dual-backend transaction coordination for the data usage
//! synchronization service.
//!
//! The coordinator reads aggregate usage from the storage-catalog
//! database, synchronizes user rows into the application metadata
//! database, and hands the readings to the usage publisher. The two
//! databases are independently transactional and share no distributed
//! commit protocol; the coordinator manages one lazily opened
//! transaction per backend and finalizes each idempotently.
//!
//! ## Atomicity
//!
//! There is deliberately no atomic commit across the two backends. In
//! the batch path the metadata commit happens before the publish call,
//! so a publish failure leaves already-committed user rows in place.
//! That window is recoverable by re-running the same batch, not by
//! automatic compensation.
//!
//! ## Concurrency
//!
//! A [`Coordinator`] serves one logical operation at a time. Create a
//! fresh instance per operation or serialize operations against one
//! instance; the per-backend transaction slots are not meant to be
//! shared across overlapping operations.

#![deny(
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    clippy::style,
    clippy::correctness,
    clippy::all,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(async_fn_in_trait)]

use std::collections::BTreeMap;

use num_traits::ToPrimitive;
use tracing::{debug, error, info, trace};

use data_usage_domain::{CanonicalUsername, Config, UserDataUsage, canonicalize_username};

mod backend;
mod error;
mod tx;

#[cfg(test)]
mod tests;

pub use backend::{
    BackendError, MetadataBackend, MetadataTx, TxHandle, UsagePublisher, UsageSourceBackend,
    UsageSourceTx,
};
pub use error::{BackendKind, CoordinationError};

use tx::TxSlot;

/// Coordinates one logical update operation across the metadata
/// database, the storage-catalog database, and the usage publisher.
///
/// Owns at most one open transaction per backend. Transactions are
/// opened lazily and memoized, and every operation finalizes both
/// slots on every exit path, so no transaction outlives the operation
/// that opened it.
pub struct Coordinator<'a, M, U, P>
where
    M: MetadataBackend,
    U: UsageSourceBackend,
    P: UsagePublisher,
{
    metadata: &'a M,
    usage_source: &'a U,
    publisher: &'a P,
    config: &'a Config,
    metadata_slot: TxSlot<M::Tx>,
    usage_source_slot: TxSlot<U::Tx>,
}

impl<'a, M, U, P> Coordinator<'a, M, U, P>
where
    M: MetadataBackend,
    U: UsageSourceBackend,
    P: UsagePublisher,
{
    /// Creates a coordinator over the given collaborators.
    ///
    /// The configuration must already have passed
    /// [`Config::validate`].
    #[must_use]
    pub const fn new(
        metadata: &'a M,
        usage_source: &'a U,
        publisher: &'a P,
        config: &'a Config,
    ) -> Self {
        Self {
            metadata,
            usage_source,
            publisher,
            config,
            metadata_slot: TxSlot::new("metadata"),
            usage_source_slot: TxSlot::new("usage source"),
        }
    }

    /// Returns the metadata transaction, beginning one if none is open.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Connection`] if the backend cannot
    /// begin a transaction.
    pub async fn metadata_tx(&mut self) -> Result<&mut M::Tx, CoordinationError> {
        debug!(backend = %BackendKind::Metadata, "opening backend transaction");
        let backend = self.metadata;
        self.metadata_slot
            .get_or_begin(|| backend.begin())
            .await
            .map_err(|err| CoordinationError::Connection {
                backend: BackendKind::Metadata,
                message: err.to_string(),
            })
    }

    /// Returns the usage-source transaction, beginning one if none is
    /// open.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Connection`] if the backend cannot
    /// begin a transaction.
    pub async fn usage_source_tx(&mut self) -> Result<&mut U::Tx, CoordinationError> {
        debug!(backend = %BackendKind::UsageSource, "opening backend transaction");
        let backend = self.usage_source;
        self.usage_source_slot
            .get_or_begin(|| backend.begin())
            .await
            .map_err(|err| CoordinationError::Connection {
                backend: BackendKind::UsageSource,
                message: err.to_string(),
            })
    }

    /// Whether a metadata transaction is currently open.
    #[must_use]
    pub const fn metadata_tx_open(&self) -> bool {
        self.metadata_slot.is_open()
    }

    /// Whether a usage-source transaction is currently open.
    #[must_use]
    pub const fn usage_source_tx_open(&self) -> bool {
        self.usage_source_slot.is_open()
    }

    /// Commits the open metadata transaction.
    ///
    /// The transaction slot is cleared whether or not the commit
    /// succeeds; calling this with no open transaction is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Commit`] with the backend's message
    /// if the commit fails.
    pub async fn commit_metadata(&mut self) -> Result<(), CoordinationError> {
        self.metadata_slot.commit().await.map_err(|err| {
            let err = CoordinationError::Commit {
                backend: BackendKind::Metadata,
                message: err.to_string(),
            };
            error!(%err, "commit failed");
            err
        })
    }

    /// Commits the open usage-source transaction.
    ///
    /// Same finalize semantics as [`Coordinator::commit_metadata`].
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Commit`] with the backend's message
    /// if the commit fails.
    pub async fn commit_usage_source(&mut self) -> Result<(), CoordinationError> {
        self.usage_source_slot.commit().await.map_err(|err| {
            let err = CoordinationError::Commit {
                backend: BackendKind::UsageSource,
                message: err.to_string(),
            };
            error!(%err, "commit failed");
            err
        })
    }

    /// Rolls back the open metadata transaction, if any.
    ///
    /// Safe to call repeatedly; never reports an error.
    pub async fn rollback_metadata(&mut self) {
        self.metadata_slot.rollback().await;
    }

    /// Rolls back the open usage-source transaction, if any.
    ///
    /// Safe to call repeatedly; never reports an error.
    pub async fn rollback_usage_source(&mut self) {
        self.usage_source_slot.rollback().await;
    }

    /// Synchronizes and publishes the current usage for one user.
    ///
    /// The user must already exist in the metadata database; this path
    /// never creates identities. A user with no usage rows in the
    /// storage catalog is treated as having a usage of 0. Both
    /// transaction slots are rolled back on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::UserNotFound`] for an unknown user,
    /// [`CoordinationError::UpstreamWrite`] when the publisher fails or
    /// reports that no rows were affected, and
    /// [`CoordinationError::Connection`] /
    /// [`CoordinationError::Query`] for backend failures.
    pub async fn update_single_user(
        &mut self,
        username: &str,
    ) -> Result<UserDataUsage, CoordinationError> {
        let result = self.update_single_user_inner(username).await;
        self.rollback_usage_source().await;
        self.rollback_metadata().await;
        result
    }

    async fn update_single_user_inner(
        &mut self,
        username: &str,
    ) -> Result<UserDataUsage, CoordinationError> {
        let user_info = {
            let tx = self.metadata_tx().await?;
            match tx.get_user_info(username).await {
                Ok(info) => info,
                Err(BackendError::NoRows) => {
                    return Err(CoordinationError::UserNotFound(username.to_string()));
                }
                Err(err) => {
                    return Err(CoordinationError::Query {
                        operation: "getting user info",
                        message: err.to_string(),
                    });
                }
            }
        };

        let usage = {
            let tx = self.usage_source_tx().await?;
            match tx.user_current_data_usage(username).await {
                Ok(usage) => usage,
                Err(BackendError::NoRows) => {
                    info!(username, "no usage information found; recording a usage of 0");
                    0
                }
                Err(err) => {
                    return Err(CoordinationError::Query {
                        operation: "getting current data usage",
                        message: err.to_string(),
                    });
                }
            }
        };
        // The read is done; a catalog transaction must never stay open
        // across the publish call below.
        self.rollback_usage_source().await;

        debug!(username, usage, "publishing current usage");

        let mut result = match self
            .publisher
            .update_usage_for_user(self.config, username, usage.to_f64().unwrap_or_default())
            .await
        {
            Ok(result) => result,
            Err(BackendError::NoRows) => {
                let err = CoordinationError::UpstreamWrite {
                    operation: "adding user data usage",
                    message: String::from(
                        "no rows were affected; the user may not exist in the metadata database",
                    ),
                };
                error!(%err, "publish failed");
                return Err(err);
            }
            Err(err) => {
                let err = CoordinationError::UpstreamWrite {
                    operation: "adding user data usage",
                    message: err.to_string(),
                };
                error!(%err, "publish failed");
                return Err(err);
            }
        };

        // The publisher does not independently know the canonical
        // identity; the metadata database is authoritative for it.
        result.user_id = user_info.id;
        result.username = user_info.username;

        Ok(result)
    }

    /// Synchronizes and publishes usage for every user in the half-open
    /// lexical username range `[start, end)`.
    ///
    /// Raw usernames from the catalog are canonicalized before touching
    /// the metadata database. User rows are ensured and committed
    /// before the publish step; if the publish then fails, the
    /// committed rows stay in place and re-running the batch is the
    /// recovery path. Both transaction slots are rolled back on every
    /// exit path.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinationError::Commit`] when the metadata commit
    /// fails (nothing is published in that case),
    /// [`CoordinationError::UpstreamWrite`] when the bulk publish
    /// fails, and [`CoordinationError::Connection`] /
    /// [`CoordinationError::Query`] for backend failures.
    pub async fn update_batch(
        &mut self,
        start: &str,
        end: &str,
    ) -> Result<Vec<UserDataUsage>, CoordinationError> {
        let result = self.update_batch_inner(start, end).await;
        self.rollback_usage_source().await;
        self.rollback_metadata().await;
        result
    }

    async fn update_batch_inner(
        &mut self,
        start: &str,
        end: &str,
    ) -> Result<Vec<UserDataUsage>, CoordinationError> {
        let readings = {
            let tx = self.usage_source_tx().await?;
            tx.batch_current_data_usage(start, end)
                .await
                .map_err(|err| CoordinationError::Query {
                    operation: "getting batch data usage",
                    message: err.to_string(),
                })?
        };
        // Read-only transaction; close it before any further work.
        self.rollback_usage_source().await;

        trace!(?readings, "usage readings in batch");

        let mut usages = BTreeMap::new();
        for (raw_username, reading) in &readings {
            let canonical = canonicalize_username(raw_username, &self.config.user_suffix);
            usages.insert(canonical, reading.to_f64().unwrap_or_default());
        }
        let usernames: Vec<CanonicalUsername> = usages.keys().cloned().collect();

        if usernames.is_empty() {
            trace!("no users to be ensured in the batch");
        } else {
            let tx = self.metadata_tx().await?;
            tx.ensure_users(&usernames)
                .await
                .map_err(|err| CoordinationError::Query {
                    operation: "ensuring users exist",
                    message: err.to_string(),
                })?;
        }

        self.commit_metadata().await?;

        // The rows committed above stay committed even if the publish
        // below fails; re-running the same range reconciles the usage
        // records. Repeated readings are not deduplicated or amended
        // here; that is deferred to an asynchronous cleanup process.
        self.publisher
            .add_user_updates_batch(self.config, &usages)
            .await
            .map_err(|err| CoordinationError::UpstreamWrite {
                operation: "inserting new usage",
                message: err.to_string(),
            })
    }
}
