use tavola_auth::HostedProviderConfig;
use tavola_database::DatabaseConfig;

#[derive(Debug, Clone)]
pub enum ProviderMode {
    /// In-process provider, development only.
    Local,
    /// GoTrue-style hosted provider.
    Hosted(HostedProviderConfig),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database: DatabaseConfig,
    pub provider_mode: ProviderMode,
}

impl Config {
    pub fn from_env() -> Self {
        let provider_mode = match std::env::var("MFA_PROVIDER").as_deref() {
            Ok("local") => ProviderMode::Local,
            _ => ProviderMode::Hosted(HostedProviderConfig::from_env()),
        };

        Self {
            server_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database: DatabaseConfig::from_env(),
            provider_mode,
        }
    }
}
