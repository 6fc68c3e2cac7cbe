use crate::error::HarnessError;
use planguard_domain::{ImportMode, ImportRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Mock data per import, with optional mode overrides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MockFixtures {
    #[serde(default)]
    pub mock: BTreeMap<String, JsonValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modes: BTreeMap<String, ImportMode>,
}

impl MockFixtures {
    pub fn with_import(mut self, name: impl Into<String>, data: JsonValue) -> Self {
        self.mock.insert(name.into(), data);
        self
    }

    pub fn with_mode(mut self, name: impl Into<String>, mode: ImportMode) -> Self {
        self.modes.insert(name.into(), mode);
        self
    }

    /// Fill in modes the fixture does not set itself, e.g. from the policy set's configuration.
    pub fn with_default_modes(mut self, modes: &BTreeMap<String, ImportMode>) -> Self {
        for (name, mode) in modes {
            self.modes.entry(name.clone()).or_insert(*mode);
        }
        self
    }

    pub fn mode(&self, import: &str) -> ImportMode {
        self.modes
            .get(import)
            .copied()
            .unwrap_or_else(|| ImportMode::default_for(import))
    }

    /// A registry holding the mocks and nothing else.
    pub fn registry(&self) -> ImportRegistry {
        self.mock
            .iter()
            .fold(ImportRegistry::builder(), |builder, (name, data)| {
                builder.import_with_mode(name.clone(), self.mode(name), data.clone())
            })
            .build()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expectation {
    Pass,
    Fail,
}

impl Expectation {
    /// `pass*.json` and `fail*.json` imply their expectation.
    pub fn from_case_name(name: &str) -> Option<Self> {
        if name.starts_with("pass") {
            Some(Expectation::Pass)
        } else if name.starts_with("fail") {
            Some(Expectation::Fail)
        } else {
            None
        }
    }
}

/// One scenario: mocks plus the expected outcome and optional per-rule expectations.
#[derive(Clone, Debug, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub fixtures: MockFixtures,
    pub expected_pass: bool,
    pub rules: BTreeMap<String, bool>,
}

#[derive(Deserialize)]
struct TestCaseDoc {
    #[serde(flatten)]
    fixtures: MockFixtures,
    #[serde(default)]
    expect: Option<Expectation>,
    #[serde(default)]
    test: BTreeMap<String, bool>,
}

impl TestCase {
    pub fn new(name: impl Into<String>, fixtures: MockFixtures, expected_pass: bool) -> Self {
        Self {
            name: name.into(),
            fixtures,
            expected_pass,
            rules: BTreeMap::new(),
        }
    }

    pub fn expect_rule(mut self, rule: impl Into<String>, value: bool) -> Self {
        self.rules.insert(rule.into(), value);
        self
    }

    /// Parse a fixture document.
    ///
    /// An explicit `expect` wins over the name prefix; a case with neither is invalid.
    pub fn from_json(name: &str, input: &str) -> Result<Self, HarnessError> {
        let invalid = |reason: String| HarnessError::InvalidCase {
            case: name.to_string(),
            reason,
        };
        let doc: TestCaseDoc = serde_json::from_str(input).map_err(|e| invalid(e.to_string()))?;
        let expect = doc
            .expect
            .or_else(|| Expectation::from_case_name(name))
            .ok_or_else(|| {
                invalid("no \"expect\" key and the name does not start with pass or fail".into())
            })?;

        Ok(Self {
            name: name.to_string(),
            fixtures: doc.fixtures,
            expected_pass: expect == Expectation::Pass,
            rules: doc.test,
        })
    }
}
