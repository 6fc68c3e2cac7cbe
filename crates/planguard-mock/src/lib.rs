//! Policy test harness.
//!
//! Test cases evaluate a policy against mock import data only, after a static
//! pass checks that the mocks have the shapes the policy expects. IO-free:
//! fixture documents arrive as strings.

#![forbid(unsafe_code)]

mod error;
mod fixtures;
mod harness;
mod typecheck;

pub use error::HarnessError;
pub use fixtures::{Expectation, MockFixtures, TestCase};
pub use harness::{TestSuite, run_case, run_test};
pub use typecheck::typecheck;
