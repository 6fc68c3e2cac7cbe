use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `planguard.toml` schema v1.
///
/// User-facing and permissive: every key is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanguardConfigV1 {
    /// Optional schema string for tooling (`planguard.config.v1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// `strict` (default), `soft` or `advisory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Run-level deadline shared by every policy in the set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// How many violations a decision keeps before truncating the list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_violations: Option<u32>,

    /// Map of import name -> config.
    #[serde(default)]
    pub imports: BTreeMap<String, ImportConfig>,

    /// Map of policy name -> config.
    #[serde(default)]
    pub policies: BTreeMap<String, PolicyConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImportConfig {
    /// `strict` or `permissive`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PolicyConfig {
    /// Policy document path, relative to the policy set root.
    /// Defaults to `policies/<name>.toml`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Overrides both the document's level and the profile default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_level: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}
