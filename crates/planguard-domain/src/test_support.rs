use crate::expr::{all, and, attr, get, lit, member, or, print, var};
use crate::imports::ImportRegistry;
use crate::policy::{Policy, Rule};
use planguard_types::EnforcementLevel;
use serde_json::{Value as JsonValue, json};

pub fn registry(import: &str, data: JsonValue) -> ImportRegistry {
    ImportRegistry::builder().import(import, data).build()
}

pub fn resources_registry(resources: JsonValue) -> ImportRegistry {
    registry("tfplan", json!({ "resources": resources }))
}

pub fn policy(level: EnforcementLevel, rules: Vec<Rule>) -> Policy {
    Policy::new("test-policy", level, rules).expect("valid policy")
}

/// `main = "aws" in tfconfig.providers`.
pub fn providers_policy(level: EnforcementLevel) -> Policy {
    policy(
        level,
        vec![Rule::new(
            "main",
            member(lit("aws"), attr("tfconfig", "providers")),
        )],
    )
}

/// Every planned resource uses an approved instance type; offenders are printed.
pub fn instance_type_policy(level: EnforcementLevel) -> Policy {
    let approved = lit(vec!["t3.micro", "t3.small"]);
    let check = or([
        member(get(var("r"), "instance_type"), approved),
        and([
            print([
                get(var("r"), "address"),
                lit(" has unapproved instance_type "),
                get(var("r"), "instance_type"),
            ]),
            lit(false),
        ]),
    ]);
    policy(
        level,
        vec![Rule::new("main", all(attr("tfplan", "resources"), "r", check))],
    )
}
