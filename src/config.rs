use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub seed: Option<SeedConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Domain used for addresses created at startup.
    pub domain: String,
    pub auth_life: Duration,
    /// Page cap for event polling; 0 means unlimited.
    pub max_updates_per_event: usize,
    /// Drop imported messages that duplicate one already in the address.
    pub enable_dedup: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            domain: "proton.local".to_string(),
            auth_life: Duration::from_secs(3600),
            max_updates_per_event: 0,
            enable_dedup: false,
        }
    }
}

/// A user created with a primary address when the server starts.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub username: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let seed = match (
            std::env::var("MOCK_SEED_USERNAME"),
            std::env::var("MOCK_SEED_PASSWORD"),
        ) {
            (Ok(username), Ok(password)) => Some(SeedConfig { username, password }),
            _ => None,
        };

        Ok(Self {
            server: ServerConfig {
                host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: std::env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()?,
            },
            backend: BackendConfig {
                domain: std::env::var("MOCK_DOMAIN")
                    .unwrap_or_else(|_| "proton.local".to_string()),
                auth_life: Duration::from_secs(
                    std::env::var("MOCK_AUTH_LIFE_SECS")
                        .unwrap_or_else(|_| "3600".to_string())
                        .parse()?,
                ),
                max_updates_per_event: std::env::var("MOCK_MAX_UPDATES_PER_EVENT")
                    .unwrap_or_else(|_| "0".to_string())
                    .parse()?,
                enable_dedup: std::env::var("MOCK_ENABLE_DEDUP")
                    .unwrap_or_else(|_| "false".to_string())
                    .parse()?,
            },
            seed,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_defaults() {
        let config = BackendConfig::default();
        assert_eq!(config.auth_life, Duration::from_secs(3600));
        assert_eq!(config.max_updates_per_event, 0);
        assert!(!config.enable_dedup);
    }
}
