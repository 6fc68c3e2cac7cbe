use crate::{model::PlanguardConfigV1, presets};
use anyhow::Context;
use planguard_domain::ImportMode;
use planguard_types::EnforcementLevel;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub profile: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EffectiveConfig {
    pub profile: String,
    pub default_level: EnforcementLevel,
    /// `None` disables the run deadline.
    pub timeout_ms: Option<u64>,
    pub max_violations: usize,
    /// Explicit import mode overrides; unlisted imports use [`ImportMode::default_for`].
    pub import_modes: BTreeMap<String, ImportMode>,
    pub policies: BTreeMap<String, PolicySettings>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicySettings {
    pub source: String,
    pub level: Option<EnforcementLevel>,
    pub enabled: bool,
}

impl PolicySettings {
    pub fn for_name(name: &str) -> Self {
        Self {
            source: format!("policies/{name}.toml"),
            level: None,
            enabled: true,
        }
    }
}

impl EffectiveConfig {
    pub fn import_mode(&self, import: &str) -> ImportMode {
        self.import_modes
            .get(import)
            .copied()
            .unwrap_or_else(|| ImportMode::default_for(import))
    }

    /// Config beats the policy document, which beats the profile default.
    pub fn level_for(&self, policy: &str, document: Option<EnforcementLevel>) -> EnforcementLevel {
        self.policies
            .get(policy)
            .and_then(|p| p.level)
            .or(document)
            .unwrap_or(self.default_level)
    }

    /// Enabled policies in name order.
    pub fn enabled_policies(&self) -> impl Iterator<Item = (&str, &PolicySettings)> {
        self.policies
            .iter()
            .filter(|(_, p)| p.enabled)
            .map(|(name, p)| (name.as_str(), p))
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub effective: EffectiveConfig,
}

pub fn resolve_config(
    cfg: PlanguardConfigV1,
    overrides: Overrides,
) -> anyhow::Result<ResolvedConfig> {
    let profile = overrides
        .profile
        .clone()
        .or(cfg.profile.clone())
        .unwrap_or_else(|| presets::DEFAULT_PROFILE.to_string());

    let mut effective = presets::preset(&profile).with_context(|| {
        format!("unknown profile: {profile} (expected strict|soft|advisory)")
    })?;

    if let Some(ms) = overrides.timeout_ms.or(cfg.timeout_ms) {
        effective.timeout_ms = Some(ms);
    }

    if let Some(mv) = cfg.max_violations {
        effective.max_violations = mv as usize;
    }

    for (import, ic) in cfg.imports.iter() {
        if let Some(mode) = ic.mode.as_deref() {
            let mode = parse_import_mode(mode)
                .with_context(|| format!("invalid mode for import {import}"))?;
            effective.import_modes.insert(import.clone(), mode);
        }
    }

    for (name, pc) in cfg.policies.iter() {
        let mut entry = PolicySettings::for_name(name);
        if let Some(source) = pc.source.as_deref() {
            entry.source = source.to_string();
        }
        if let Some(level) = pc.enforcement_level.as_deref() {
            entry.level = Some(
                parse_level(level)
                    .with_context(|| format!("invalid enforcement_level for policy {name}"))?,
            );
        }
        if let Some(enabled) = pc.enabled {
            entry.enabled = enabled;
        }
        effective.policies.insert(name.clone(), entry);
    }

    Ok(ResolvedConfig { effective })
}

pub(crate) fn parse_level(v: &str) -> anyhow::Result<EnforcementLevel> {
    v.parse::<EnforcementLevel>().map_err(|_| {
        anyhow::anyhow!(
            "unknown enforcement level: {v} (expected advisory|soft-mandatory|hard-mandatory)"
        )
    })
}

fn parse_import_mode(v: &str) -> anyhow::Result<ImportMode> {
    match v {
        "strict" => Ok(ImportMode::Strict),
        "permissive" => Ok(ImportMode::Permissive),
        other => anyhow::bail!("unknown import mode: {other} (expected strict|permissive)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_config_toml;

    fn resolve(input: &str, overrides: Overrides) -> anyhow::Result<EffectiveConfig> {
        let cfg = parse_config_toml(input)?;
        Ok(resolve_config(cfg, overrides)?.effective)
    }

    #[test]
    fn empty_config_uses_strict_profile() {
        let eff = resolve("", Overrides::default()).expect("resolve");
        assert_eq!(eff.profile, "strict");
        assert_eq!(eff.default_level, EnforcementLevel::HardMandatory);
        assert_eq!(eff.timeout_ms, Some(30_000));
        assert_eq!(eff.max_violations, 200);
        assert!(eff.policies.is_empty());
    }

    #[test]
    fn profiles_pick_the_default_level() {
        let soft = resolve("profile = \"soft\"", Overrides::default()).expect("soft");
        assert_eq!(soft.default_level, EnforcementLevel::SoftMandatory);

        let advisory = resolve("profile = \"advisory\"", Overrides::default()).expect("advisory");
        assert_eq!(advisory.default_level, EnforcementLevel::Advisory);
        assert_eq!(advisory.timeout_ms, None);
    }

    #[test]
    fn overrides_take_precedence() {
        let eff = resolve(
            "profile = \"soft\"\ntimeout_ms = 100",
            Overrides {
                profile: Some("advisory".to_string()),
                timeout_ms: Some(5),
            },
        )
        .expect("resolve");
        assert_eq!(eff.profile, "advisory");
        assert_eq!(eff.timeout_ms, Some(5));
    }

    #[test]
    fn unknown_profile_is_an_error() {
        let err = resolve("profile = \"lenient\"", Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("unknown profile: lenient"));
    }

    #[test]
    fn policies_and_imports_are_resolved() {
        let eff = resolve(
            r#"
max_violations = 3

[imports.tfplan]
mode = "permissive"

[policies.require-aws]
enforcement_level = "soft-mandatory"

[policies.legacy]
source = "old/legacy.toml"
enabled = false
"#,
            Overrides::default(),
        )
        .expect("resolve");

        assert_eq!(eff.max_violations, 3);
        assert_eq!(eff.import_mode("tfplan"), ImportMode::Permissive);
        assert_eq!(eff.import_mode("tfrun"), ImportMode::Permissive);
        assert_eq!(eff.import_mode("tfstate"), ImportMode::Strict);

        let aws = &eff.policies["require-aws"];
        assert_eq!(aws.source, "policies/require-aws.toml");
        assert_eq!(aws.level, Some(EnforcementLevel::SoftMandatory));
        assert_eq!(eff.policies["legacy"].source, "old/legacy.toml");

        let enabled: Vec<&str> = eff.enabled_policies().map(|(n, _)| n).collect();
        assert_eq!(enabled, vec!["require-aws"]);
    }

    #[test]
    fn level_precedence_is_config_then_document_then_profile() {
        let eff = resolve(
            "[policies.a]\nenforcement_level = \"advisory\"",
            Overrides::default(),
        )
        .expect("resolve");
        assert_eq!(
            eff.level_for("a", Some(EnforcementLevel::SoftMandatory)),
            EnforcementLevel::Advisory
        );
        assert_eq!(
            eff.level_for("b", Some(EnforcementLevel::SoftMandatory)),
            EnforcementLevel::SoftMandatory
        );
        assert_eq!(eff.level_for("b", None), EnforcementLevel::HardMandatory);
    }

    #[test]
    fn invalid_values_carry_context() {
        let err = resolve(
            "[policies.a]\nenforcement_level = \"mandatory\"",
            Overrides::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("invalid enforcement_level for policy a"));

        let err = resolve("[imports.tfplan]\nmode = \"lax\"", Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown import mode: lax"));
    }
}
