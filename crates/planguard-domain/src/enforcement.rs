//! Classification of a policy result by enforcement level.

use planguard_types::{Decision, EnforcementLevel, RuleResult};
use std::collections::BTreeMap;

/// Whether a run may proceed, and whether a failure can be overridden.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Enforcement {
    pub passed: bool,
    pub overridable: bool,
}

/// Classify a `main` result. Undefined counts as false.
pub fn classify(result: RuleResult, level: EnforcementLevel) -> Enforcement {
    if result.is_true() {
        return Enforcement {
            passed: true,
            overridable: false,
        };
    }
    match level {
        EnforcementLevel::Advisory => Enforcement {
            passed: true,
            overridable: false,
        },
        EnforcementLevel::SoftMandatory => Enforcement {
            passed: false,
            overridable: true,
        },
        EnforcementLevel::HardMandatory => Enforcement {
            passed: false,
            overridable: false,
        },
    }
}

/// Produce the decision for one policy run. Violations are kept for every level.
pub fn decide(
    policy: &str,
    result: RuleResult,
    level: EnforcementLevel,
    violations: Vec<String>,
    rules: BTreeMap<String, RuleResult>,
) -> Decision {
    let Enforcement {
        passed,
        overridable,
    } = classify(result, level);

    Decision {
        policy: policy.to_string(),
        passed,
        level,
        overridable,
        result,
        violations,
        rules,
    }
}
