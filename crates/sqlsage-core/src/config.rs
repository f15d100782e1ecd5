use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "sqlsage.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model used to explain query results.
    pub base_model: String,
    /// Model used to write SQL.
    pub sql_model: String,
    pub embedding_model: String,
    pub db_path: PathBuf,
    pub schema_path: PathBuf,
    pub golden_sql_path: PathBuf,
    pub index_dir: PathBuf,
    pub answer_language: String,
    pub search_k: usize,
    pub log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_model: "gpt-4.1-mini-2025-04-14".to_string(),
            sql_model: "gpt-5-mini-2025-08-07".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            db_path: PathBuf::from("data/chinook.db"),
            schema_path: PathBuf::from("metadata/schema_metadata.yaml"),
            golden_sql_path: PathBuf::from("metadata/golden_sqls.json"),
            index_dir: PathBuf::from("vector_store"),
            answer_language: "English".to_string(),
            search_k: 10,
            log_level: "info".to_string(),
            openai_base_url: None,
        }
    }
}

impl AgentConfig {
    /// Defaults, then the YAML file (if any), then `SQLSAGE_*` overrides.
    ///
    /// An explicitly requested file must exist; the implicit
    /// `sqlsage.yaml` is only read when present.
    pub fn resolve(path: Option<&Path>, strict: bool) -> Result<Self, ConfigError> {
        let mut cfg = match path {
            Some(p) => load_config(p, strict)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                load_config(Path::new(DEFAULT_CONFIG_FILE), strict)?
            }
            None => Self::default(),
        };
        cfg.apply_env();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env(&mut self) {
        if let Ok(v) = env::var("SQLSAGE_BASE_MODEL") {
            self.base_model = v;
        }
        if let Ok(v) = env::var("SQLSAGE_SQL_MODEL") {
            self.sql_model = v;
        }
        if let Ok(v) = env::var("SQLSAGE_EMBEDDING_MODEL") {
            self.embedding_model = v;
        }
        if let Ok(v) = env::var("SQLSAGE_DB_PATH") {
            self.db_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SQLSAGE_SCHEMA_PATH") {
            self.schema_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SQLSAGE_GOLDEN_SQL_PATH") {
            self.golden_sql_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SQLSAGE_INDEX_DIR") {
            self.index_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("SQLSAGE_ANSWER_LANGUAGE") {
            self.answer_language = v;
        }
        if let Ok(v) = env::var("SQLSAGE_SEARCH_K") {
            if let Ok(n) = v.parse() {
                self.search_k = n;
            }
        }
        if let Ok(v) = env::var("SQLSAGE_LOG") {
            self.log_level = v;
        }
        if let Ok(v) = env::var("OPENAI_BASE_URL") {
            self.openai_base_url = Some(v);
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.search_k == 0 {
            return Err(ConfigError("search_k must be at least 1".into()));
        }
        for (field, value) in [
            ("base_model", &self.base_model),
            ("sql_model", &self.sql_model),
            ("embedding_model", &self.embedding_model),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError(format!("{} must not be empty", field)));
            }
        }
        Ok(())
    }

    /// Creates the parent directories of every configured path.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for p in [&self.db_path, &self.schema_path, &self.golden_sql_path] {
            if let Some(parent) = p.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::create_dir_all(&self.index_dir)
    }
}

pub fn load_config(path: &Path, strict: bool) -> Result<AgentConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError(format!("failed to read config {}: {}", path.display(), e)))?;

    if raw.trim().is_empty() {
        return Ok(AgentConfig::default());
    }

    let mut ignored_keys = std::collections::BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);
    let cfg: AgentConfig = serde_ignored::deserialize(deserializer, |path| {
        ignored_keys.insert(path.to_string());
    })
    .map_err(|e| ConfigError(format!("failed to parse YAML: {}", e)))?;

    if !ignored_keys.is_empty() {
        if strict {
            return Err(ConfigError(format!(
                "Unknown fields detected in strict mode: {:?} (file: {})",
                ignored_keys,
                path.display()
            )));
        }
        tracing::warn!(
            event = "sqlsage.config.unknown_keys",
            keys = ?ignored_keys,
            file = %path.display(),
            "ignored unknown config fields"
        );
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlsage.yaml");
        std::fs::write(&path, "sql_model: local-sql\nsearch_k: 4\n").unwrap();

        let cfg = load_config(&path, true).unwrap();
        assert_eq!(cfg.sql_model, "local-sql");
        assert_eq!(cfg.search_k, 4);
        assert_eq!(cfg.base_model, AgentConfig::default().base_model);
        assert_eq!(cfg.index_dir, PathBuf::from("vector_store"));
    }

    #[test]
    fn strict_mode_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlsage.yaml");
        std::fs::write(&path, "sql_model: x\ntemperature: 0.2\n").unwrap();

        let err = load_config(&path, true).unwrap_err();
        assert!(err.0.contains("temperature"), "{}", err);

        let cfg = load_config(&path, false).unwrap();
        assert_eq!(cfg.sql_model, "x");
    }

    #[test]
    fn empty_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sqlsage.yaml");
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(load_config(&path, true).unwrap(), AgentConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = AgentConfig::resolve(Some(Path::new("/nonexistent/sqlsage.yaml")), false)
            .unwrap_err();
        assert!(err.to_string().starts_with("config error: failed to read config"));
    }

    #[test]
    fn zero_search_k_is_rejected() {
        let cfg = AgentConfig {
            search_k: 0,
            ..AgentConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn ensure_directories_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AgentConfig {
            db_path: dir.path().join("data/app.db"),
            schema_path: dir.path().join("metadata/schema.yaml"),
            golden_sql_path: dir.path().join("metadata/golden.json"),
            index_dir: dir.path().join("vs"),
            ..AgentConfig::default()
        };
        cfg.ensure_directories().unwrap();
        assert!(dir.path().join("data").is_dir());
        assert!(dir.path().join("metadata").is_dir());
        assert!(dir.path().join("vs").is_dir());
        assert!(!cfg.db_path.exists());
    }
}
