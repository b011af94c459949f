// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.


use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use time::macros::datetime;

use data_usage_domain::{CanonicalUsername, Config, UserDataUsage, UserInfo};

use crate::backend::{
    BackendError, MetadataBackend, MetadataTx, TxHandle, UsagePublisher, UsageSourceBackend,
    UsageSourceTx,
};

/// Shared ordered record of every call the mocks receive.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn push(log: &EventLog, event: impl Into<String>) {
    log.lock().expect("event log poisoned").push(event.into());
}

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().expect("event log poisoned").clone()
}

pub fn position(events: &[String], prefix: &str) -> usize {
    events
        .iter()
        .position(|event| event.starts_with(prefix))
        .unwrap_or_else(|| panic!("no event starting with {prefix:?} in {events:?}"))
}

pub fn count(events: &[String], prefix: &str) -> usize {
    events
        .iter()
        .filter(|event| event.starts_with(prefix))
        .count()
}

pub fn test_config() -> Config {
    Config {
        metadata_uri: String::from("postgres://metadata.example.org/de"),
        metadata_schema: String::from("public"),
        usage_source_uri: String::from("postgres://catalog.example.org/icat"),
        zone: String::from("tempZone"),
        root_resource_names: vec![String::from("mainIngestRes")],
        user_suffix: String::from("example.org"),
        refresh_interval_seconds: 180,
    }
}

pub fn fixed_time() -> OffsetDateTime {
    datetime!(2026-02-03 04:05:06 UTC)
}

/// The record the mock publisher returns for one batch entry.
pub fn batch_record(username: &str, total: f64) -> UserDataUsage {
    UserDataUsage {
        id: format!("reading-{username}"),
        user_id: format!("id-{username}"),
        username: username.to_string(),
        total,
        time: fixed_time(),
    }
}

// ============================================================================
// Metadata backend mock
// ============================================================================

pub struct MockMetadataBackend {
    pub log: EventLog,
    pub begin_error: Option<BackendError>,
    pub users: HashMap<String, UserInfo>,
    pub ensure_error: Option<BackendError>,
    pub commit_error: Option<BackendError>,
    pub rollback_error: Option<BackendError>,
}

impl MockMetadataBackend {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            begin_error: None,
            users: HashMap::new(),
            ensure_error: None,
            commit_error: None,
            rollback_error: None,
        }
    }

    pub fn with_user(mut self, username: &str, id: &str) -> Self {
        self.users.insert(
            username.to_string(),
            UserInfo::new(id.to_string(), username.to_string()),
        );
        self
    }
}

pub struct MockMetadataTx {
    log: EventLog,
    users: HashMap<String, UserInfo>,
    ensure_error: Option<BackendError>,
    commit_error: Option<BackendError>,
    rollback_error: Option<BackendError>,
}

impl MetadataBackend for MockMetadataBackend {
    type Tx = MockMetadataTx;

    async fn begin(&self) -> Result<MockMetadataTx, BackendError> {
        push(&self.log, "metadata.begin");
        if let Some(err) = &self.begin_error {
            return Err(err.clone());
        }
        Ok(MockMetadataTx {
            log: Arc::clone(&self.log),
            users: self.users.clone(),
            ensure_error: self.ensure_error.clone(),
            commit_error: self.commit_error.clone(),
            rollback_error: self.rollback_error.clone(),
        })
    }
}

impl TxHandle for MockMetadataTx {
    async fn commit(self) -> Result<(), BackendError> {
        push(&self.log, "metadata.commit");
        match self.commit_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rollback(self) -> Result<(), BackendError> {
        push(&self.log, "metadata.rollback");
        match self.rollback_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl MetadataTx for MockMetadataTx {
    async fn get_user_info(&mut self, username: &str) -> Result<UserInfo, BackendError> {
        push(&self.log, format!("metadata.get_user_info:{username}"));
        self.users.get(username).cloned().ok_or(BackendError::NoRows)
    }

    async fn ensure_users(
        &mut self,
        usernames: &[CanonicalUsername],
    ) -> Result<(), BackendError> {
        let joined = usernames
            .iter()
            .map(CanonicalUsername::as_str)
            .collect::<Vec<_>>()
            .join(",");
        push(&self.log, format!("metadata.ensure_users:{joined}"));
        match &self.ensure_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Usage-source backend mock
// ============================================================================

pub struct MockUsageBackend {
    pub log: EventLog,
    pub begin_error: Option<BackendError>,
    pub usage: HashMap<String, i64>,
    pub batch: HashMap<String, i64>,
    pub batch_error: Option<BackendError>,
    pub commit_error: Option<BackendError>,
    pub rollback_error: Option<BackendError>,
}

impl MockUsageBackend {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            begin_error: None,
            usage: HashMap::new(),
            batch: HashMap::new(),
            batch_error: None,
            commit_error: None,
            rollback_error: None,
        }
    }

    pub fn with_usage(mut self, username: &str, usage: i64) -> Self {
        self.usage.insert(username.to_string(), usage);
        self
    }

    pub fn with_batch_reading(mut self, username: &str, usage: i64) -> Self {
        self.batch.insert(username.to_string(), usage);
        self
    }
}

pub struct MockUsageTx {
    log: EventLog,
    usage: HashMap<String, i64>,
    batch: HashMap<String, i64>,
    batch_error: Option<BackendError>,
    commit_error: Option<BackendError>,
    rollback_error: Option<BackendError>,
}

impl UsageSourceBackend for MockUsageBackend {
    type Tx = MockUsageTx;

    async fn begin(&self) -> Result<MockUsageTx, BackendError> {
        push(&self.log, "usage.begin");
        if let Some(err) = &self.begin_error {
            return Err(err.clone());
        }
        Ok(MockUsageTx {
            log: Arc::clone(&self.log),
            usage: self.usage.clone(),
            batch: self.batch.clone(),
            batch_error: self.batch_error.clone(),
            commit_error: self.commit_error.clone(),
            rollback_error: self.rollback_error.clone(),
        })
    }
}

impl TxHandle for MockUsageTx {
    async fn commit(self) -> Result<(), BackendError> {
        push(&self.log, "usage.commit");
        match self.commit_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rollback(self) -> Result<(), BackendError> {
        push(&self.log, "usage.rollback");
        match self.rollback_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl UsageSourceTx for MockUsageTx {
    async fn user_current_data_usage(&mut self, username: &str) -> Result<i64, BackendError> {
        push(&self.log, format!("usage.read:{username}"));
        self.usage.get(username).copied().ok_or(BackendError::NoRows)
    }

    async fn batch_current_data_usage(
        &mut self,
        start: &str,
        end: &str,
    ) -> Result<HashMap<String, i64>, BackendError> {
        push(&self.log, format!("usage.batch:{start}..{end}"));
        match &self.batch_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.batch.clone()),
        }
    }
}

// ============================================================================
// Publisher mock
// ============================================================================

pub struct MockPublisher {
    pub log: EventLog,
    pub single_error: Option<BackendError>,
    pub batch_error: Option<BackendError>,
}

impl MockPublisher {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            single_error: None,
            batch_error: None,
        }
    }
}

impl UsagePublisher for MockPublisher {
    async fn update_usage_for_user(
        &self,
        _config: &Config,
        username: &str,
        usage: f64,
    ) -> Result<UserDataUsage, BackendError> {
        push(&self.log, format!("publisher.update:{username}:{usage}"));
        if let Some(err) = &self.single_error {
            return Err(err.clone());
        }
        // Deliberately wrong identity fields: the coordinator is
        // responsible for overwriting them with the resolved identity.
        Ok(UserDataUsage {
            id: String::from("reading-1"),
            user_id: String::from("publisher-user-id"),
            username: String::from("publisher-username"),
            total: usage,
            time: fixed_time(),
        })
    }

    async fn add_user_updates_batch(
        &self,
        _config: &Config,
        usages: &BTreeMap<CanonicalUsername, f64>,
    ) -> Result<Vec<UserDataUsage>, BackendError> {
        let described = usages
            .iter()
            .map(|(username, usage)| format!("{username}={usage}"))
            .collect::<Vec<_>>()
            .join(",");
        push(&self.log, format!("publisher.batch:{described}"));
        if let Some(err) = &self.batch_error {
            return Err(err.clone());
        }
        Ok(usages
            .iter()
            .map(|(username, total)| batch_record(username.as_str(), *total))
            .collect())
    }
}
