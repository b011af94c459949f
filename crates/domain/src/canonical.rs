// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Username canonicalization.
//!
//! The storage catalog stores raw, unqualified usernames; the metadata
//! database keys user rows on the fully domain-qualified form. Every
//! username crossing from the usage-source domain into the metadata
//! domain must pass through [`canonicalize_username`] first.

use serde::{Deserialize, Serialize};

/// A fully domain-qualified username.
///
/// This is the join key used by the metadata database. Values are only
/// produced by [`canonicalize_username`], so holding one is proof the
/// qualification step has happened.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalUsername(String);

impl CanonicalUsername {
    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the value and returns the underlying `String`.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CanonicalUsername {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CanonicalUsername {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Qualifies a raw username with the configured domain suffix.
///
/// Pure and deterministic: surrounding whitespace is trimmed, a suffix
/// configured with a leading `@` is tolerated, and a name that already
/// ends with `@<suffix>` is returned unchanged. The function is
/// idempotent, so applying it to an already-canonical username is safe.
#[must_use]
pub fn canonicalize_username(raw: &str, suffix: &str) -> CanonicalUsername {
    let raw = raw.trim();
    let suffix = suffix.trim().trim_start_matches('@');
    let qualifier = format!("@{suffix}");

    if raw.ends_with(&qualifier) {
        CanonicalUsername(raw.to_string())
    } else {
        CanonicalUsername(format!("{raw}{qualifier}"))
    }
}
