//! Common test utilities for feedsync end-to-end tests

#[allow(dead_code)]
pub mod fixtures;

pub use fixtures::*;
