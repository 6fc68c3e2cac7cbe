//! Stable DTOs and IDs used across the planguard workspace.
//!
//! This crate is intentionally boring:
//! - enforcement levels and the decisions produced for a policy
//! - per-policy outcomes, including aborted and errored runs
//! - report envelopes for policy-set runs and test runs
//! - stable string IDs and codes

#![forbid(unsafe_code)]

pub mod decision;
pub mod ids;
pub mod report;

pub use decision::{Decision, EnforcementLevel, PolicyOutcome, RuleResult};
pub use report::{
    PolicySetData, PolicySetReport, RuleMismatch, SCHEMA_REPORT_V1, SCHEMA_TEST_REPORT_V1,
    SuiteStatus, TestCaseOutcome, TestReport, TestResult, TestSuiteResult, TestSummary, ToolMeta,
    Verdict,
};
