use crate::error::HarnessError;
use crate::fixtures::{MockFixtures, TestCase};
use crate::typecheck::typecheck;
use planguard_domain::{Policy, evaluate};
use planguard_types::{
    RuleMismatch, RuleResult, SuiteStatus, TestCaseOutcome, TestResult, TestSuiteResult,
};

/// Evaluate `policy` against `fixtures` alone and compare `passed` with the expectation.
pub fn run_test(
    policy: &Policy,
    fixtures: &MockFixtures,
    expected_pass: bool,
) -> Result<TestResult, HarnessError> {
    run_case(
        policy,
        &TestCase::new("inline", fixtures.clone(), expected_pass),
    )
}

/// Like [`run_test`], also checking the case's per-rule expectations.
///
/// A rule the evaluation never reached counts as a mismatch.
pub fn run_case(policy: &Policy, case: &TestCase) -> Result<TestResult, HarnessError> {
    typecheck(policy, &case.fixtures)?;
    let registry = case.fixtures.registry();
    let decision = evaluate(policy, &registry)?;

    let mismatches: Vec<RuleMismatch> = case
        .rules
        .iter()
        .filter_map(|(rule, expected)| {
            let actual = decision.rules.get(rule).copied();
            (actual != Some(RuleResult::from(*expected))).then(|| RuleMismatch {
                rule: rule.clone(),
                expected: *expected,
                actual,
            })
        })
        .collect();
    let succeeded = decision.passed == case.expected_pass && mismatches.is_empty();

    tracing::debug!(
        policy = policy.name(),
        case = %case.name,
        expected_pass = case.expected_pass,
        actual_pass = decision.passed,
        succeeded,
        "test case finished"
    );

    Ok(TestResult {
        policy: policy.name().to_string(),
        case: case.name.clone(),
        expected_pass: case.expected_pass,
        actual_pass: decision.passed,
        succeeded,
        mismatches,
        violations: decision.violations,
    })
}

/// The scenarios for one policy.
///
/// A suite is adequately tested only with at least one "should pass" and one
/// "should fail" case.
#[derive(Clone, Debug, Default)]
pub struct TestSuite {
    policy: String,
    cases: Vec<TestCase>,
    invalid: Vec<(String, HarnessError)>,
}

impl TestSuite {
    pub fn new(policy: impl Into<String>) -> Self {
        Self {
            policy: policy.into(),
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &str {
        &self.policy
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn push(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    /// Record a case that could not be parsed; it is reported as errored.
    pub fn push_invalid(&mut self, case: impl Into<String>, error: HarnessError) {
        self.invalid.push((case.into(), error));
    }

    /// Scenario kinds the suite lacks: `pass`, `fail`, or both.
    pub fn missing(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if !self.cases.iter().any(|c| c.expected_pass) {
            missing.push("pass".to_string());
        }
        if !self.cases.iter().any(|c| !c.expected_pass) {
            missing.push("fail".to_string());
        }
        missing
    }

    pub fn run(&self, policy: &Policy) -> TestSuiteResult {
        let cases = self
            .cases
            .iter()
            .map(|case| match run_case(policy, case) {
                Ok(result) => TestCaseOutcome::Completed(result),
                Err(err) => errored(&case.name, &err),
            })
            .chain(self.invalid.iter().map(|(name, err)| errored(name, err)))
            .collect();
        self.finish(cases)
    }

    /// Report every case as errored, for a policy that failed to load.
    pub fn fail_all(&self, code: &str, message: &str) -> TestSuiteResult {
        let cases = self
            .cases
            .iter()
            .map(|case| TestCaseOutcome::Errored {
                case: case.name.clone(),
                code: code.to_string(),
                message: message.to_string(),
            })
            .chain(self.invalid.iter().map(|(name, err)| errored(name, err)))
            .collect();
        TestSuiteResult {
            policy: self.policy.clone(),
            status: SuiteStatus::Failed,
            cases,
            missing: self.missing(),
        }
    }

    fn finish(&self, cases: Vec<TestCaseOutcome>) -> TestSuiteResult {
        let missing = self.missing();
        let status = if !cases.iter().all(TestCaseOutcome::succeeded) {
            SuiteStatus::Failed
        } else if !missing.is_empty() {
            SuiteStatus::Incomplete
        } else {
            SuiteStatus::Passed
        };
        TestSuiteResult {
            policy: self.policy.clone(),
            status,
            cases,
            missing,
        }
    }
}

fn errored(case: &str, err: &HarnessError) -> TestCaseOutcome {
    TestCaseOutcome::Errored {
        case: case.to_string(),
        code: err.code().to_string(),
        message: err.to_string(),
    }
}
