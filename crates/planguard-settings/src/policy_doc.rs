//! Policy definition documents.
//!
//! ```toml
//! name = "require-aws"
//! enforcement_level = "hard-mandatory"
//! imports = ["tfconfig"]
//!
//! [[rules]]
//! name = "main"
//! expr = { in = [{ literal = "aws" }, { attr = { import = "tfconfig", path = "providers" } }] }
//! ```

use crate::resolve::parse_level;
use anyhow::Context;
use planguard_domain::{Expr, Policy, Rule};
use planguard_types::EnforcementLevel;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocV1 {
    /// Defaults to the name the policy is configured under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_level: Option<String>,

    /// Imports the rules may reference.
    #[serde(default)]
    pub imports: Vec<String>,

    #[serde(default)]
    pub rules: Vec<RuleDoc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleDoc {
    pub name: String,
    pub expr: Expr,
}

impl PolicyDocV1 {
    pub fn level(&self) -> anyhow::Result<Option<EnforcementLevel>> {
        self.enforcement_level
            .as_deref()
            .map(parse_level)
            .transpose()
    }
}

/// Build the rule arena for `name` at `level`.
///
/// Fails when the document names a different policy, when the rules do not form
/// an acyclic policy with a `main` rule, or when a rule references an import the
/// document does not declare.
pub fn compile_policy(
    name: &str,
    doc: PolicyDocV1,
    level: EnforcementLevel,
) -> anyhow::Result<Policy> {
    if let Some(doc_name) = doc.name.as_deref()
        && doc_name != name
    {
        anyhow::bail!("policy document is named {doc_name} but configured as {name}");
    }

    let rules = doc
        .rules
        .into_iter()
        .map(|r| Rule::new(r.name, r.expr))
        .collect();
    let policy = Policy::new(name, level, rules).with_context(|| format!("policy {name}"))?;
    policy
        .dependency_order()
        .with_context(|| format!("policy {name}"))?;

    let undeclared: Vec<&str> = policy
        .imports()
        .into_iter()
        .filter(|import| !doc.imports.iter().any(|d| d == import))
        .collect();
    if !undeclared.is_empty() {
        anyhow::bail!(
            "policy {name} references undeclared imports: {}",
            undeclared.join(", ")
        );
    }

    Ok(policy)
}
