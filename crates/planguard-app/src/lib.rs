//! Use case orchestration for planguard.
//!
//! This crate provides the application layer: loading a policy set from disk,
//! evaluating it against an import snapshot, and running policy test suites.
//! Evaluation semantics live in `planguard-domain`; this crate only does IO and
//! report assembly.

#![forbid(unsafe_code)]

mod check;
mod policy_set;
mod snapshot;
mod testing;

pub use check::{CheckInput, CheckOutput, run_check, verdict_exit_code};
pub use snapshot::load_snapshot;
pub use testing::run_tests;
