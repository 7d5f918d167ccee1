/// Server configuration.
///
/// Values are read once at startup from environment variables, with defaults
/// suited to local development.
use std::env;
use std::path::PathBuf;

use log::warn;

/// Default interface the HTTP server binds to.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON-lines file receiving game events. Events are only logged when unset.
    pub event_log_path: Option<PathBuf>,
}

impl ServerConfig {
    /// Build the configuration from `HOST`, `PORT` and `EVENT_LOG_PATH`.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().unwrap_or_else(|_| {
                warn!("[Config] Invalid PORT value '{}', using {}", raw, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            Err(_) => DEFAULT_PORT,
        };
        let event_log_path = env::var_os("EVENT_LOG_PATH")
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Self { host, port, event_log_path }
    }
}
