//! Read-only named data sources exposed to rule logic.
//!
//! A registry is built once per run, before any rule is evaluated, and has no
//! mutators afterwards. It is `Send + Sync`, so a policy set can share one
//! snapshot across threads without locking.

use crate::error::EvalError;
use crate::path;
use crate::value::Value;
use planguard_types::ids;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// How missing attributes resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Missing attributes are an error (`UnknownAttribute`).
    Strict,
    /// Missing attributes resolve to Undefined.
    Permissive,
}

impl ImportMode {
    /// Plan, config and state data are strict; run metadata is permissive.
    pub fn default_for(import: &str) -> Self {
        match import {
            ids::IMPORT_TFPLAN | ids::IMPORT_TFCONFIG | ids::IMPORT_TFSTATE => ImportMode::Strict,
            ids::IMPORT_TFRUN => ImportMode::Permissive,
            _ => ImportMode::Strict,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImportMode::Strict => "strict",
            ImportMode::Permissive => "permissive",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Import {
    pub name: String,
    pub mode: ImportMode,
    pub data: Value,
}

#[derive(Clone, Debug, Default)]
pub struct ImportRegistry {
    imports: BTreeMap<String, Import>,
}

#[derive(Clone, Debug, Default)]
pub struct ImportRegistryBuilder {
    imports: BTreeMap<String, Import>,
}

impl ImportRegistryBuilder {
    /// Register `name` with its default mode. A later registration of the same name replaces it.
    pub fn import(self, name: impl Into<String>, data: impl Into<Value>) -> Self {
        let name = name.into();
        let mode = ImportMode::default_for(&name);
        self.import_with_mode(name, mode, data)
    }

    pub fn import_with_mode(
        mut self,
        name: impl Into<String>,
        mode: ImportMode,
        data: impl Into<Value>,
    ) -> Self {
        let name = name.into();
        self.imports.insert(
            name.clone(),
            Import {
                name,
                mode,
                data: data.into(),
            },
        );
        self
    }

    pub fn build(self) -> ImportRegistry {
        ImportRegistry {
            imports: self.imports,
        }
    }
}

impl ImportRegistry {
    pub fn builder() -> ImportRegistryBuilder {
        ImportRegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&Import> {
        self.imports.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.imports.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    /// Resolve `attribute_path` on `import_name`.
    pub fn resolve(&self, import_name: &str, attribute_path: &str) -> Result<Value, EvalError> {
        let import = self
            .imports
            .get(import_name)
            .ok_or_else(|| EvalError::UnknownImport(import_name.to_string()))?;
        let segments = path::parse(attribute_path)?;

        match import.data.lookup(&segments) {
            Some(value) => Ok(value.clone()),
            None => match import.mode {
                ImportMode::Strict => Err(EvalError::UnknownAttribute {
                    import: import_name.to_string(),
                    path: attribute_path.to_string(),
                }),
                ImportMode::Permissive => Ok(Value::Undefined),
            },
        }
    }

    /// Stable SHA-256 fingerprint of the snapshot.
    ///
    /// Identity fields, per import in name order:
    /// - name
    /// - mode
    /// - canonical JSON of the data (map keys sorted)
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for import in self.imports.values() {
            let canonical = JsonValue::from(import.data.clone()).to_string();
            let line = [import.name.as_str(), import.mode.as_str(), canonical.as_str()].join("|");
            hasher.update(line.as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(hasher.finalize())
    }
}
