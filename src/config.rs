use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IndexerConfig {
    pub database: Option<String>,
    /// Drop documentation comments of functions and classes
    #[serde(default)]
    pub skip_doccomment: bool,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("xref.toml")
}

pub fn default_database_path_in(base: &Path) -> PathBuf {
    base.join(".xref").join("xref.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<IndexerConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: IndexerConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &IndexerConfig, force: bool) -> anyhow::Result<()> {
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

/// Keep the store directory out of version control.
pub fn ensure_gitignore(project_root: &Path) -> anyhow::Result<()> {
    let gitignore_path = project_root.join(".gitignore");
    let entry = ".xref/";

    let mut content = if gitignore_path.exists() {
        std::fs::read_to_string(&gitignore_path)?
    } else {
        String::new()
    };
    if content.lines().any(|line| line.trim() == entry) {
        return Ok(());
    }
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(entry);
    content.push('\n');
    std::fs::write(&gitignore_path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        let config = load_config(Some(&dir.path().join("xref.toml"))).unwrap();
        assert!(config.is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xref.toml");
        let config = IndexerConfig {
            database: Some(".xref/xref.db".to_string()),
            skip_doccomment: true,
        };
        write_config(&path, &config, false).unwrap();

        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
    }

    #[test]
    fn test_skip_doccomment_defaults_to_false() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xref.toml");
        std::fs::write(&path, "database = \"index.db\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(config.database.as_deref(), Some("index.db"));
        assert!(!config.skip_doccomment);
    }

    #[test]
    fn test_write_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xref.toml");
        write_config(&path, &IndexerConfig::default(), false).unwrap();

        assert!(write_config(&path, &IndexerConfig::default(), false).is_err());
        assert!(write_config(&path, &IndexerConfig::default(), true).is_ok());
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = TempDir::new().unwrap();
        let db = default_database_path_in(dir.path());
        ensure_db_dir(&db).unwrap();
        assert!(dir.path().join(".xref").is_dir());
    }

    #[test]
    fn test_gitignore_entry_added_once() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/").unwrap();
        ensure_gitignore(dir.path()).unwrap();
        ensure_gitignore(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "target/\n.xref/\n");
    }
}
