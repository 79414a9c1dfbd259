use crate::api::DEFAULT_SERVER_URL;
use crate::config::{ConfigManager, ServerConfig};
use anyhow::Result;

pub const SERVER_URL_ENV: &str = "ERRAND_SERVER_URL";

/// Resolves which order server the client talks to
pub struct ServerConfigManager {
    config_manager: ConfigManager,
}

impl ServerConfigManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_manager: ConfigManager::new()?,
        })
    }

    pub fn with_config_manager(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Determine the server URL based on priority:
    /// 1. CLI argument
    /// 2. `ERRAND_SERVER_URL`
    /// 3. Saved configuration file
    /// 4. Built-in default
    pub fn determine_server_url(&self, cli_override: Option<String>) -> Result<String> {
        let env_url = std::env::var(SERVER_URL_ENV).ok();
        self.resolve(cli_override, env_url)
    }

    fn resolve(&self, cli_override: Option<String>, env_url: Option<String>) -> Result<String> {
        if let Some(url) = cli_override.filter(|u| !u.trim().is_empty()) {
            return Ok(url);
        }

        if let Some(url) = env_url.filter(|u| !u.trim().is_empty()) {
            return Ok(url);
        }

        if let Some(config) = self.config_manager.load_server_config()? {
            return Ok(config.server_url);
        }

        Ok(DEFAULT_SERVER_URL.to_string())
    }

    /// Save server URL to the configuration file
    pub fn save_server_url(&self, server_url: String) -> Result<()> {
        let config = ServerConfig {
            server_url,
            last_updated: chrono::Utc::now(),
        };
        self.config_manager.save_server_config(&config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager(temp_dir: &TempDir) -> ServerConfigManager {
        ServerConfigManager::with_config_manager(ConfigManager::with_dir(temp_dir.path()).unwrap())
    }

    #[test]
    fn test_default_when_nothing_configured() {
        let temp_dir = TempDir::new().unwrap();
        let url = manager(&temp_dir).resolve(None, None).unwrap();
        assert_eq!(url, DEFAULT_SERVER_URL);
    }

    #[test]
    fn test_priority_order() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager(&temp_dir);
        manager.save_server_url("http://saved:1".to_string()).unwrap();

        assert_eq!(manager.resolve(None, None).unwrap(), "http://saved:1");
        assert_eq!(
            manager.resolve(None, Some("http://env:2".to_string())).unwrap(),
            "http://env:2"
        );
        assert_eq!(
            manager
                .resolve(Some("http://cli:3".to_string()), Some("http://env:2".to_string()))
                .unwrap(),
            "http://cli:3"
        );
    }

    #[test]
    fn test_blank_overrides_are_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let url = manager(&temp_dir)
            .resolve(Some("  ".to_string()), Some(String::new()))
            .unwrap();
        assert_eq!(url, DEFAULT_SERVER_URL);
    }
}
