//! Loading the policies of a policy set from disk.

use crate::snapshot::files_with_extension;
use anyhow::Context;
use camino::Utf8Path;
use planguard_domain::{EvalError, Policy};
use planguard_settings::{EffectiveConfig, PolicySettings, compile_policy, parse_policy_toml};
use planguard_types::ids;

/// A configured policy; loading failures are kept per policy so the rest of the set still runs.
pub(crate) struct LoadedPolicy {
    pub name: String,
    pub policy: anyhow::Result<Policy>,
}

/// Enabled policies in name order.
///
/// With no `[policies]` table in the config, every `policies/*.toml` file is a policy
/// named after its file stem.
pub(crate) fn load_policy_set(
    root: &Utf8Path,
    effective: &EffectiveConfig,
) -> anyhow::Result<Vec<LoadedPolicy>> {
    let configured: Vec<(String, PolicySettings)> = if effective.policies.is_empty() {
        discover(root)?
    } else {
        effective
            .enabled_policies()
            .map(|(name, settings)| (name.to_string(), settings.clone()))
            .collect()
    };

    Ok(configured
        .into_iter()
        .map(|(name, settings)| {
            let policy = load_policy(root, &name, &settings, effective);
            LoadedPolicy { name, policy }
        })
        .collect())
}

fn discover(root: &Utf8Path) -> anyhow::Result<Vec<(String, PolicySettings)>> {
    let dir = root.join("policies");
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    Ok(files_with_extension(&dir, "toml")?
        .into_iter()
        .filter_map(|path| path.file_stem().map(str::to_string))
        .map(|name| {
            let settings = PolicySettings::for_name(&name);
            (name, settings)
        })
        .collect())
}

fn load_policy(
    root: &Utf8Path,
    name: &str,
    settings: &PolicySettings,
    effective: &EffectiveConfig,
) -> anyhow::Result<Policy> {
    let path = root.join(&settings.source);
    let text = std::fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
    let doc = parse_policy_toml(&text).with_context(|| format!("parse {path}"))?;
    let document_level = doc.level().with_context(|| format!("policy {name}"))?;
    let level = effective.level_for(name, document_level);
    compile_policy(name, doc, level)
}

/// Stable code for a load failure: the domain error's code when there is one.
pub(crate) fn load_error_code(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|e| e.downcast_ref::<EvalError>())
        .map(EvalError::code)
        .unwrap_or(ids::CODE_INVALID_POLICY)
}
