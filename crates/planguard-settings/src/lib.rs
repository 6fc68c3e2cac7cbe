//! Config parsing and profile/preset resolution.
//!
//! This crate is IO-free: it parses and resolves configuration and policy
//! documents provided as strings.

#![forbid(unsafe_code)]

mod model;
mod policy_doc;
mod presets;
mod resolve;

pub use model::{ImportConfig, PlanguardConfigV1, PolicyConfig};
pub use policy_doc::{PolicyDocV1, RuleDoc, compile_policy};
pub use resolve::{EffectiveConfig, Overrides, PolicySettings, ResolvedConfig};

/// Parse `planguard.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<PlanguardConfigV1> {
    let cfg: PlanguardConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Parse a policy definition document.
pub fn parse_policy_toml(input: &str) -> anyhow::Result<PolicyDocV1> {
    let doc: PolicyDocV1 = toml::from_str(input)?;
    Ok(doc)
}

/// Resolve the effective config used by the app layer (profile + overrides + per-policy config).
pub fn resolve_config(
    cfg: PlanguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
