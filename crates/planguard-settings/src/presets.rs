use crate::resolve::EffectiveConfig;
use planguard_types::EnforcementLevel;
use std::collections::BTreeMap;

pub const DEFAULT_PROFILE: &str = "strict";

/// Preset profiles pick the default enforcement level, deadline and violation cap.
///
/// Anything policy-specific belongs in the policy set config.
pub fn preset(profile: &str) -> Option<EffectiveConfig> {
    match profile {
        "strict" => Some(base("strict", EnforcementLevel::HardMandatory)),
        "soft" => Some(base("soft", EnforcementLevel::SoftMandatory)),
        "advisory" => Some(EffectiveConfig {
            timeout_ms: None,
            ..base("advisory", EnforcementLevel::Advisory)
        }),
        _ => None,
    }
}

fn base(profile: &str, default_level: EnforcementLevel) -> EffectiveConfig {
    EffectiveConfig {
        profile: profile.to_string(),
        default_level,
        timeout_ms: Some(30_000),
        max_violations: 200,
        import_modes: BTreeMap::new(),
        policies: BTreeMap::new(),
    }
}
