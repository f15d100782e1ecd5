use super::{extract, merge, ExtractOptions, Schema};
use anyhow::Context;
use indexmap::IndexMap;
use std::path::Path;

/// The schema file as last written, read loosely so a hand-edit that breaks
/// one table does not break the whole file.
pub type SavedSchema = IndexMap<String, serde_yaml::Value>;

const BOM: char = '\u{feff}';

fn read_yaml(path: &Path) -> anyhow::Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let raw = raw.trim_start_matches(BOM);
    if raw.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(raw.to_string()))
}

pub fn load_saved(path: &Path) -> anyhow::Result<SavedSchema> {
    match read_yaml(path)? {
        Some(raw) => serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse schema file {}", path.display())),
        None => Ok(SavedSchema::new()),
    }
}

/// Strict read used by the indexer; every table must be a well-formed record.
pub fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    match read_yaml(path)? {
        Some(raw) => serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse schema file {}", path.display())),
        None => Ok(Schema::new()),
    }
}

pub fn persist(schema: &Schema, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(schema)?;
    std::fs::write(path, yaml)
        .with_context(|| format!("failed to write schema file {}", path.display()))?;
    tracing::info!(
        event = "sqlsage.schema.saved",
        path = %path.display(),
        tables = schema.len()
    );
    Ok(())
}

/// Extracts, merges with the saved file, and writes the result back.
///
/// An unreadable saved file is reported and overwritten with the fresh
/// extraction.
pub fn refresh_schema_file(db_path: &Path, path: &Path, opts: ExtractOptions) -> anyhow::Result<Schema> {
    let fresh = extract(db_path, opts)?;

    let merged = match load_saved(path) {
        Ok(existing) => merge(&existing, fresh),
        Err(e) => {
            tracing::warn!(
                event = "sqlsage.schema.merge_failed",
                path = %path.display(),
                error = %format!("{:#}", e),
                "merge failed, overwriting with fresh extraction"
            );
            fresh
        }
    };

    persist(&merged, path)?;
    Ok(merged)
}
