use std::path::PathBuf;

/// Process settings read from the environment (`.env` is loaded first)
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Directory holding the verification store snapshot
    pub state_path: PathBuf,
    /// Port of the verification page / dashboard API
    pub web_port: u16,
    /// Public URL of the web server; enables link-based verification
    pub web_base_url: Option<String>,
    /// Bearer token required by the dashboard API, if set
    pub dashboard_api_key: Option<String>,
    /// Log lines kept in memory for the dashboard
    pub log_buffer_size: usize,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("state"),
            web_port: 8080,
            web_base_url: None,
            dashboard_api_key: None,
            log_buffer_size: 1000,
        }
    }
}

impl BotSettings {
    /// Create settings from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            state_path: non_empty("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            web_port: non_empty("WEB_PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.web_port),
            web_base_url: non_empty("WEB_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            dashboard_api_key: non_empty("DASHBOARD_API_KEY"),
            log_buffer_size: non_empty("LOG_BUFFER_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.log_buffer_size),
        }
    }

    /// Where the verification store snapshot lives
    pub fn store_file(&self) -> PathBuf {
        self.state_path.join("verification_store.json")
    }

    /// Link to the hosted verification page for a token
    pub fn verify_url(&self, token: &str) -> Option<String> {
        self.web_base_url
            .as_ref()
            .map(|base| format!("{}/verify/{}", base, token))
    }
}
