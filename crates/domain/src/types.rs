// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A user's identity as recorded in the metadata database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// The user's internal identifier.
    pub id: String,
    /// The user's canonical username.
    pub username: String,
}

impl UserInfo {
    /// Creates a new `UserInfo`.
    #[must_use]
    pub const fn new(id: String, username: String) -> Self {
        Self { id, username }
    }
}

/// A synchronized usage record as returned by the usage publisher.
///
/// The publisher fills in the record identifier, the stored total, and
/// the reading timestamp. The `user_id` and `username` fields reflect
/// the identity resolved from the metadata database; the publisher may
/// not independently know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDataUsage {
    /// The identifier of the stored usage record.
    pub id: String,
    /// The user's internal identifier.
    pub user_id: String,
    /// The user's canonical username.
    pub username: String,
    /// The total data usage, in bytes.
    pub total: f64,
    /// When the reading was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}
