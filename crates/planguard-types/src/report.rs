use crate::decision::{PolicyOutcome, RuleResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Stable schema identifiers for planguard reports.
pub const SCHEMA_REPORT_V1: &str = "planguard.report.v1";
pub const SCHEMA_TEST_REPORT_V1: &str = "planguard.test-report.v1";

/// Overall classification of a policy-set run.
///
/// Ordered by severity: the verdict of a run is the worst verdict of its policies.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Pass,
    /// Only advisory policies failed.
    Advisory,
    /// At least one soft-mandatory policy failed; overridable.
    SoftFail,
    HardFail,
    /// The run-level deadline expired; never equivalent to a pass.
    Aborted,
    /// A policy could not be evaluated.
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

/// Planguard-specific summary payload for a policy-set report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct PolicySetData {
    pub profile: String,

    pub policies_total: u32,
    pub policies_passed: u32,
    pub policies_failed: u32,
    pub policies_aborted: u32,
    pub policies_errored: u32,

    /// SHA-256 of the import snapshot the policies were evaluated against.
    pub snapshot_fingerprint: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicySetReport {
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub verdict: Verdict,
    pub outcomes: Vec<PolicyOutcome>,
    pub data: PolicySetData,
}

/// A rule whose value differed from what a test case asserted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RuleMismatch {
    pub rule: String,
    pub expected: bool,
    pub actual: Option<RuleResult>,
}

/// Result of running one policy against one mock fixture set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestResult {
    pub policy: String,
    pub case: String,
    pub expected_pass: bool,
    pub actual_pass: bool,
    /// `actual_pass == expected_pass` and no rule mismatches.
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<RuleMismatch>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum TestCaseOutcome {
    Completed(TestResult),
    /// The case could not run (mock type mismatch, evaluation error, unreadable fixture).
    Errored {
        case: String,
        code: String,
        message: String,
    },
}

impl TestCaseOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, TestCaseOutcome::Completed(r) if r.succeeded)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SuiteStatus {
    Passed,
    Failed,
    /// Missing a "should pass" or "should fail" scenario.
    Incomplete,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TestSuiteResult {
    pub policy: String,
    pub status: SuiteStatus,
    pub cases: Vec<TestCaseOutcome>,
    /// Scenario kinds the suite lacks (`pass`, `fail`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    pub incomplete: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestReport {
    pub schema: String,
    pub tool: ToolMeta,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
    pub suites: Vec<TestSuiteResult>,
    pub summary: TestSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_order_follows_severity() {
        assert!(Verdict::Pass < Verdict::Advisory);
        assert!(Verdict::SoftFail < Verdict::HardFail);
        assert!(Verdict::HardFail < Verdict::Aborted);
        assert_eq!(
            serde_json::to_value(Verdict::SoftFail).expect("serialize"),
            "soft-fail"
        );
    }
}
