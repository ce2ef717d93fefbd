use scrapemaster_core::config::env_or;
use scrapemaster_core::error::AppError;

/// Listen address for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    /// `SCRAPEMASTER_HOST` (default `0.0.0.0`), `SCRAPEMASTER_PORT` (default 8000).
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        Ok(Self {
            host: env_or("SCRAPEMASTER_HOST", defaults.host)?,
            port: env_or("SCRAPEMASTER_PORT", defaults.port)?,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
