// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for the Redis cluster operator
//!
//! This module contains unit tests for:
//! - PodDisruptionBudget generation and drift detection
//! - PodDisruptionBudget operations against an in-memory store
//! - Reconciliation decisions
//! - Validation logic
//! - Configuration parsing

#[path = "../common/mod.rs"]
mod common;

mod pdb;
