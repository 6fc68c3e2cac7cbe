//! The `check` use case: evaluate a policy set against an import snapshot.

use crate::policy_set::{LoadedPolicy, load_error_code, load_policy_set};
use anyhow::Context;
use camino::Utf8Path;
use planguard_domain::{EvalOptions, ImportRegistry, evaluate_with};
use planguard_settings::{EffectiveConfig, Overrides, ResolvedConfig};
use planguard_types::{
    Decision, PolicyOutcome, PolicySetData, PolicySetReport, SCHEMA_REPORT_V1, ToolMeta, Verdict,
};
use rayon::prelude::*;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use time::OffsetDateTime;

/// Input for the check use case.
#[derive(Clone, Debug)]
pub struct CheckInput<'a> {
    /// Policy set root: holds `planguard.toml` and the policy documents.
    pub root: &'a Utf8Path,
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// Caller overrides.
    pub overrides: Overrides,
    /// Import snapshot: import name -> data.
    pub imports: BTreeMap<String, JsonValue>,
}

/// Output from the check use case.
#[derive(Clone, Debug)]
pub struct CheckOutput {
    pub report: PolicySetReport,
    /// The resolved configuration used.
    pub resolved_config: ResolvedConfig,
}

/// Run the check use case: parse config, load policies, evaluate them concurrently, produce a report.
pub fn run_check(input: CheckInput<'_>) -> anyhow::Result<CheckOutput> {
    let started_at = OffsetDateTime::now_utc();

    // Parse config (empty is allowed, defaults apply).
    let cfg = if input.config_text.trim().is_empty() {
        planguard_settings::PlanguardConfigV1::default()
    } else {
        planguard_settings::parse_config_toml(input.config_text).context("parse config")?
    };
    let resolved = planguard_settings::resolve_config(cfg, input.overrides.clone())
        .context("resolve config")?;
    let effective = &resolved.effective;

    let policies = load_policy_set(input.root, effective).context("load policy set")?;
    let registry = build_registry(&input.imports, effective);

    let options = EvalOptions {
        deadline: effective
            .timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms)),
    };

    // One immutable registry shared by every policy; results keep policy order.
    let outcomes: Vec<PolicyOutcome> = policies
        .par_iter()
        .map(|loaded| run_policy(loaded, &registry, &options))
        .collect();

    let verdict = overall_verdict(&outcomes);
    let (outcomes, truncated) = capped_outcomes(&outcomes, effective.max_violations);
    let data = summarize(&outcomes, effective, registry.fingerprint(), truncated);
    tracing::info!(
        verdict = ?verdict,
        policies = data.policies_total,
        failed = data.policies_failed,
        "policy set evaluated"
    );

    let report = PolicySetReport {
        schema: SCHEMA_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "planguard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at: OffsetDateTime::now_utc(),
        verdict,
        outcomes,
        data,
    };

    Ok(CheckOutput {
        report,
        resolved_config: resolved,
    })
}

fn build_registry(imports: &BTreeMap<String, JsonValue>, effective: &EffectiveConfig) -> ImportRegistry {
    imports
        .iter()
        .fold(ImportRegistry::builder(), |builder, (name, data)| {
            builder.import_with_mode(name.clone(), effective.import_mode(name), data.clone())
        })
        .build()
}

fn run_policy(loaded: &LoadedPolicy, registry: &ImportRegistry, options: &EvalOptions) -> PolicyOutcome {
    let policy = match &loaded.policy {
        Ok(policy) => policy,
        Err(err) => {
            let code = load_error_code(err);
            let message = format!("{err:#}");
            tracing::warn!(policy = %loaded.name, code, error = %message, "policy failed to load");
            return PolicyOutcome::Errored {
                policy: loaded.name.clone(),
                code: code.to_string(),
                message,
            };
        }
    };

    match evaluate_with(policy, registry, options) {
        Ok(decision) => {
            tracing::info!(
                policy = %decision.policy,
                level = %decision.level,
                passed = decision.passed,
                violations = decision.violations.len(),
                "policy decided"
            );
            PolicyOutcome::Decided(decision)
        }
        Err(err) if err.is_aborted() => {
            tracing::warn!(policy = %loaded.name, error = %err, "policy aborted");
            PolicyOutcome::Aborted {
                policy: loaded.name.clone(),
                reason: err.to_string(),
            }
        }
        Err(err) => {
            tracing::warn!(policy = %loaded.name, code = err.code(), error = %err, "policy errored");
            PolicyOutcome::Errored {
                policy: loaded.name.clone(),
                code: err.code().to_string(),
                message: err.to_string(),
            }
        }
    }
}

fn outcome_verdict(outcome: &PolicyOutcome) -> Verdict {
    match outcome {
        PolicyOutcome::Decided(d) if d.is_hard_block() => Verdict::HardFail,
        PolicyOutcome::Decided(d) if !d.passed => Verdict::SoftFail,
        PolicyOutcome::Decided(d) if !d.result.is_true() => Verdict::Advisory,
        PolicyOutcome::Decided(_) => Verdict::Pass,
        PolicyOutcome::Aborted { .. } => Verdict::Aborted,
        PolicyOutcome::Errored { .. } => Verdict::Error,
    }
}

/// Worst verdict across the set; an empty set passes.
fn overall_verdict(outcomes: &[PolicyOutcome]) -> Verdict {
    outcomes
        .iter()
        .map(outcome_verdict)
        .max()
        .unwrap_or(Verdict::Pass)
}

/// Report copies of the outcomes with at most `max` violations per decision.
///
/// The evaluated decisions are left as produced; only the report is capped.
fn capped_outcomes(outcomes: &[PolicyOutcome], max: usize) -> (Vec<PolicyOutcome>, bool) {
    let mut truncated = false;
    let capped = outcomes
        .iter()
        .map(|outcome| match outcome {
            PolicyOutcome::Decided(d) if d.violations.len() > max => {
                truncated = true;
                PolicyOutcome::Decided(Decision {
                    violations: d.violations[..max].to_vec(),
                    ..d.clone()
                })
            }
            other => other.clone(),
        })
        .collect();
    (capped, truncated)
}

fn summarize(
    outcomes: &[PolicyOutcome],
    effective: &EffectiveConfig,
    snapshot_fingerprint: String,
    truncated: bool,
) -> PolicySetData {
    let mut data = PolicySetData {
        profile: effective.profile.clone(),
        policies_total: outcomes.len() as u32,
        snapshot_fingerprint,
        timeout_ms: effective.timeout_ms,
        truncated_reason: truncated.then(|| {
            format!(
                "violations truncated to max_violations={} per policy",
                effective.max_violations
            )
        }),
        ..PolicySetData::default()
    };
    for outcome in outcomes {
        match outcome {
            PolicyOutcome::Decided(d) if d.passed => data.policies_passed += 1,
            PolicyOutcome::Decided(_) => data.policies_failed += 1,
            PolicyOutcome::Aborted { .. } => data.policies_aborted += 1,
            PolicyOutcome::Errored { .. } => data.policies_errored += 1,
        }
    }
    data
}

/// Map verdict to exit code: 0 = pass/advisory, 2 = soft-fail, 3 = hard-fail, 4 = aborted, 1 = error.
pub fn verdict_exit_code(verdict: Verdict) -> i32 {
    match verdict {
        Verdict::Pass | Verdict::Advisory => 0,
        Verdict::SoftFail => 2,
        Verdict::HardFail => 3,
        Verdict::Aborted => 4,
        Verdict::Error => 1,
    }
}
