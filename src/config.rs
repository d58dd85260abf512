//! Engine configuration.
//!
//! Values come from CLI flags, falling back to environment variables
//! (optionally loaded from a `.env` file) and then to the defaults below.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::LoadError;

pub const DEFAULT_HISTORY_PATH: &str = "historico_bugs.csv";
pub const DEFAULT_MODEL_CONFIG_PATHS: &[&str] =
    &["modelo_diez_config.json", "modelo_diez_config (2).json"];
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Where the engines load their data from and where the server listens.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Historical resolved-issue dataset (CSV).
    pub history_path: PathBuf,
    /// Model configuration candidates, tried in order.
    pub model_config_paths: Vec<PathBuf>,
    /// Address for the HTTP server.
    pub listen_addr: SocketAddr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_path: PathBuf::from(DEFAULT_HISTORY_PATH),
            model_config_paths: DEFAULT_MODEL_CONFIG_PATHS
                .iter()
                .map(PathBuf::from)
                .collect(),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
        }
    }
}

impl EngineConfig {
    /// First model configuration candidate that exists on disk.
    pub fn resolve_model_config(&self) -> Result<PathBuf, LoadError> {
        let found = self
            .model_config_paths
            .iter()
            .position(|p| p.is_file())
            .ok_or_else(|| LoadError::ConfigNotFound {
                candidates: self.model_config_paths.clone(),
            })?;

        if found > 0 {
            tracing::warn!(
                "Using fallback model configuration {}",
                self.model_config_paths[found].display()
            );
        }
        Ok(self.model_config_paths[found].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_candidates() {
        let config = EngineConfig::default();
        assert_eq!(config.history_path, PathBuf::from("historico_bugs.csv"));
        assert_eq!(config.model_config_paths.len(), 2);
        assert_eq!(config.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
    }

    #[test]
    fn test_resolve_prefers_first_existing() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        std::fs::write(&second, "{}").unwrap();

        let mut config = EngineConfig {
            model_config_paths: vec![first.clone(), second.clone()],
            ..Default::default()
        };
        assert_eq!(config.resolve_model_config().unwrap(), second);

        std::fs::write(&first, "{}").unwrap();
        assert_eq!(config.resolve_model_config().unwrap(), first);

        config.model_config_paths = vec![dir.path().join("missing.json")];
        assert!(matches!(
            config.resolve_model_config(),
            Err(LoadError::ConfigNotFound { .. })
        ));
    }
}
