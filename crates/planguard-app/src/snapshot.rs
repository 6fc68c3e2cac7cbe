use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use walkdir::WalkDir;

/// Read an import snapshot directory: each `<name>.json` file becomes import `<name>`.
pub fn load_snapshot(dir: &Utf8Path) -> anyhow::Result<BTreeMap<String, JsonValue>> {
    let mut imports = BTreeMap::new();
    for path in json_files(dir)? {
        let Some(name) = path.file_stem() else {
            continue;
        };
        let text = std::fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
        let data: JsonValue =
            serde_json::from_str(&text).with_context(|| format!("parse {path}"))?;
        imports.insert(name.to_string(), data);
    }
    Ok(imports)
}

/// `*.json` files directly inside `dir`, sorted by file name.
pub(crate) fn json_files(dir: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    files_with_extension(dir, "json")
}

pub(crate) fn files_with_extension(dir: &Utf8Path, ext: &str) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("walk {dir}"))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            continue;
        };
        if path.extension() == Some(ext) {
            out.push(path);
        }
    }
    Ok(out)
}
