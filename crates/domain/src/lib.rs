// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Domain types for the data usage synchronization service.
//!
//! This crate holds the pure, I/O-free pieces shared by the rest of the
//! workspace: usernames and their canonical (domain-qualified) form, the
//! identity and usage records exchanged with the backends, and the
//! validated runtime configuration.

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

mod canonical;
mod config;
mod error;
mod types;


pub use canonical::{CanonicalUsername, canonicalize_username};
pub use config::Config;
pub use error::ConfigError;
pub use types::{UserDataUsage, UserInfo};
