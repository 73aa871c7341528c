use crate::acceptor::DEFAULT_BACKLOG;
use crate::error::{ServerError, ServerResult};
use tracing::level_filters::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Hostname or IP address the server listens on
    pub listen_address: String,
    pub port: u16,
    pub backlog: i32,

    /// Level filter for the diagnostic logs (`error` .. `trace`, or `off`)
    pub log_level: String,

    /// Directory served by the bundled file handler
    pub document_root: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "localhost".to_string(),
            port: 8080,
            backlog: DEFAULT_BACKLOG,
            log_level: "info".to_string(),
            document_root: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address and port to listen on
    pub fn with_address(mut self, address: &str, port: u16) -> Self {
        self.listen_address = address.to_string();
        self.port = port;
        self
    }

    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn with_log_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    pub fn with_document_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.document_root = root.as_ref().to_path_buf();
        self
    }

    /// Get the full address string (address:port)
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    /// The configured log level as a filter
    pub fn level_filter(&self) -> ServerResult<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| ServerError::Config(format!("unknown log level: {}", self.log_level)))
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> ServerResult<()> {
        if self.listen_address.trim().is_empty() {
            return Err(ServerError::Config("listen_address is empty".to_string()));
        }
        if self.backlog <= 0 {
            return Err(ServerError::Config(format!(
                "backlog must be positive, got {}",
                self.backlog
            )));
        }
        self.level_filter()?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ServerResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save_to_json_file<P: AsRef<Path>>(&self, path: P) -> ServerResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::new();
        assert_eq!(config.socket_address(), "localhost:8080");
        assert_eq!(config.backlog, 10_000);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::INFO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "port": 9000, "log_level": "debug" }"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.listen_address, "localhost");
        assert_eq!(config.level_filter().unwrap(), LevelFilter::DEBUG);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            ServerConfig::new().with_backlog(0).validate(),
            Err(ServerError::Config(_))
        ));
        assert!(matches!(
            ServerConfig::new().with_log_level("loud").validate(),
            Err(ServerError::Config(_))
        ));
        assert!(matches!(
            ServerConfig::new().with_address(" ", 80).validate(),
            Err(ServerError::Config(_))
        ));
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.json");
        let config = ServerConfig::new()
            .with_address("127.0.0.1", 3000)
            .with_document_root("/srv/www");

        config.save_to_json_file(&path).unwrap();
        assert_eq!(ServerConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ServerConfig::from_json_file(&path),
            Err(ServerError::Json(_))
        ));
    }
}
