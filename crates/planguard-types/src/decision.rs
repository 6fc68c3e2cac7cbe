use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// How a failing policy affects the run it guards.
///
/// Closed on purpose: every consumer matches all three levels.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum EnforcementLevel {
    /// Failure is logged, never blocks.
    Advisory,
    /// Failure blocks unless an authorized party overrides it.
    SoftMandatory,
    /// Failure always blocks.
    HardMandatory,
}

impl EnforcementLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            EnforcementLevel::Advisory => "advisory",
            EnforcementLevel::SoftMandatory => "soft-mandatory",
            EnforcementLevel::HardMandatory => "hard-mandatory",
        }
    }
}

impl fmt::Display for EnforcementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnforcementLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advisory" => Ok(EnforcementLevel::Advisory),
            "soft-mandatory" | "soft_mandatory" => Ok(EnforcementLevel::SoftMandatory),
            "hard-mandatory" | "hard_mandatory" => Ok(EnforcementLevel::HardMandatory),
            other => Err(format!(
                "unknown enforcement level: {other} (expected advisory|soft-mandatory|hard-mandatory)"
            )),
        }
    }
}

/// Three-valued result of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RuleResult {
    True,
    False,
    Undefined,
}

impl RuleResult {
    /// Undefined counts as failing.
    pub fn is_true(self) -> bool {
        matches!(self, RuleResult::True)
    }
}

impl From<bool> for RuleResult {
    fn from(value: bool) -> Self {
        if value {
            RuleResult::True
        } else {
            RuleResult::False
        }
    }
}

/// Outcome of evaluating one policy, as consumed by the provisioning pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    pub policy: String,
    pub passed: bool,
    pub level: EnforcementLevel,
    /// Set only for failing soft-mandatory policies. Acted on by an external authorization step.
    pub overridable: bool,
    /// Value of the `main` rule.
    pub result: RuleResult,
    /// Messages emitted by `print`, in emission order (duplicates kept).
    #[serde(default)]
    pub violations: Vec<String>,
    /// Results of every rule evaluated during the run.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleResult>,
}

impl Decision {
    /// True when this decision stops the run without any override path.
    pub fn is_hard_block(&self) -> bool {
        !self.passed && !self.overridable
    }
}

/// Per-policy outcome inside a policy-set run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum PolicyOutcome {
    Decided(Decision),
    /// Evaluation failed before a decision could be made (unknown import, cycle, ...).
    Errored {
        policy: String,
        code: String,
        message: String,
    },
    /// The run-level deadline expired before this policy finished.
    Aborted { policy: String, reason: String },
}

impl PolicyOutcome {
    pub fn policy(&self) -> &str {
        match self {
            PolicyOutcome::Decided(d) => &d.policy,
            PolicyOutcome::Errored { policy, .. } => policy,
            PolicyOutcome::Aborted { policy, .. } => policy,
        }
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            PolicyOutcome::Decided(d) => Some(d),
            _ => None,
        }
    }
}
