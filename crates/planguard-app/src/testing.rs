//! The `test` use case: run every policy's test suite against its mock fixtures.

use crate::policy_set::{LoadedPolicy, load_error_code, load_policy_set};
use crate::snapshot::json_files;
use anyhow::Context;
use camino::Utf8Path;
use planguard_mock::{TestCase, TestSuite};
use planguard_settings::{EffectiveConfig, Overrides, PlanguardConfigV1};
use planguard_types::{
    SCHEMA_TEST_REPORT_V1, SuiteStatus, TestReport, TestSuiteResult, TestSummary, ToolMeta,
};
use rayon::prelude::*;
use time::OffsetDateTime;

/// Run the test suites of the policy set at `root`.
///
/// Cases for policy `<name>` are the `test/<name>/*.json` files; `planguard.toml`
/// is read from `root` when present.
pub fn run_tests(root: &Utf8Path) -> anyhow::Result<TestReport> {
    let started_at = OffsetDateTime::now_utc();

    let config_path = root.join("planguard.toml");
    let cfg = if config_path.is_file() {
        let text = std::fs::read_to_string(&config_path)
            .with_context(|| format!("read {config_path}"))?;
        planguard_settings::parse_config_toml(&text).context("parse config")?
    } else {
        PlanguardConfigV1::default()
    };
    let resolved =
        planguard_settings::resolve_config(cfg, Overrides::default()).context("resolve config")?;

    let policies = load_policy_set(root, &resolved.effective).context("load policy set")?;
    let suites = policies
        .par_iter()
        .map(|loaded| run_suite(root, loaded, &resolved.effective))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut summary = TestSummary::default();
    for suite in &suites {
        match suite.status {
            SuiteStatus::Passed => summary.passed += 1,
            SuiteStatus::Failed => summary.failed += 1,
            SuiteStatus::Incomplete => summary.incomplete += 1,
        }
    }

    Ok(TestReport {
        schema: SCHEMA_TEST_REPORT_V1.to_string(),
        tool: ToolMeta {
            name: "planguard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        started_at,
        finished_at: OffsetDateTime::now_utc(),
        suites,
        summary,
    })
}

fn run_suite(
    root: &Utf8Path,
    loaded: &LoadedPolicy,
    effective: &EffectiveConfig,
) -> anyhow::Result<TestSuiteResult> {
    let suite = load_suite(root, &loaded.name, effective)?;
    let result = match &loaded.policy {
        Ok(policy) => suite.run(policy),
        Err(err) => suite.fail_all(load_error_code(err), &format!("{err:#}")),
    };

    if result.status == SuiteStatus::Incomplete {
        tracing::warn!(policy = %loaded.name, missing = ?result.missing, "test suite incomplete");
    } else {
        tracing::info!(
            policy = %loaded.name,
            status = ?result.status,
            cases = result.cases.len(),
            "test suite finished"
        );
    }
    Ok(result)
}

/// Cases run with the configured import modes unless a fixture sets its own.
fn load_suite(
    root: &Utf8Path,
    policy: &str,
    effective: &EffectiveConfig,
) -> anyhow::Result<TestSuite> {
    let mut suite = TestSuite::new(policy);
    let dir = root.join("test").join(policy);
    if !dir.is_dir() {
        return Ok(suite);
    }

    for path in json_files(&dir)? {
        let Some(name) = path.file_stem() else {
            continue;
        };
        let text = std::fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
        match TestCase::from_json(name, &text) {
            Ok(mut case) => {
                case.fixtures = case.fixtures.with_default_modes(&effective.import_modes);
                suite.push(case);
            }
            Err(err) => suite.push_invalid(name, err),
        }
    }
    Ok(suite)
}
