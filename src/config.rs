use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExprdbConfig {
    pub database: Option<String>,
    pub batch_size: Option<usize>,
    pub on_empty_gene_id: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("exprdb.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("exprdb.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ExprdbConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ExprdbConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ExprdbConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("exprdb.toml"))).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exprdb.toml");

        let config = ExprdbConfig {
            database: Some("data/exprdb.db".to_string()),
            batch_size: Some(512),
            on_empty_gene_id: Some("reject".to_string()),
        };
        write_config(&path, &config, false).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded.database.as_deref(), Some("data/exprdb.db"));
        assert_eq!(loaded.batch_size, Some(512));
        assert_eq!(loaded.on_empty_gene_id.as_deref(), Some("reject"));
    }

    #[test]
    fn test_write_without_force_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exprdb.toml");
        write_config(&path, &ExprdbConfig::default(), false).unwrap();

        assert!(write_config(&path, &ExprdbConfig::default(), false).is_err());
        assert!(write_config(&path, &ExprdbConfig::default(), true).is_ok());
    }

    #[test]
    fn test_ensure_db_dir_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("store").join("exprdb.db");

        ensure_db_dir(&db_path).unwrap();
        assert!(db_path.parent().unwrap().is_dir());
    }
}
