/// Configuration for the leadboard CLI.
/// Reads config.json from ~/.config/leadboard/config.json (or platform equivalent).
use std::fs;
use std::path::{Path, PathBuf};

use leadboard_core::BoardConfig;

/// Default config path: ~/.config/leadboard/config.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leadboard")
        .join("config.json")
}

/// Default store path: ~/.local/share/leadboard/board.json
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("leadboard")
        .join("board.json")
}

/// Load config from path. Returns default if the file doesn't exist or
/// cannot be parsed.
pub fn load_config(path: &Path) -> BoardConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse config {}: {}", path.display(), e);
            BoardConfig::default()
        }),
        Err(_) => {
            log::info!("No config at {}, using defaults", path.display());
            BoardConfig::default()
        }
    }
}

/// Store location: explicit override, then config, then the platform default.
pub fn resolve_store_path(config: &BoardConfig, override_path: Option<&Path>) -> PathBuf {
    override_path
        .map(Path::to_path_buf)
        .or_else(|| config.store_path.clone())
        .unwrap_or_else(default_store_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadboard_core::UnresolvedPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("config.json"));
        assert_eq!(config, BoardConfig::default());
    }

    #[test]
    fn test_malformed_config_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config(&path), BoardConfig::default());
    }

    #[test]
    fn test_config_file_is_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{ "unresolvedPolicy": "fabricate", "storePath": "/tmp/leads.json" }"#,
        )
        .unwrap();
        let config = load_config(&path);
        assert_eq!(config.unresolved_policy, UnresolvedPolicy::Fabricate);
        assert_eq!(
            resolve_store_path(&config, None),
            PathBuf::from("/tmp/leads.json")
        );
        assert_eq!(
            resolve_store_path(&config, Some(Path::new("other.json"))),
            PathBuf::from("other.json")
        );
    }
}
