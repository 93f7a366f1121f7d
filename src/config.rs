use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Pactum";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is not set.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Get the application data directory (~/Pactum/ on all platforms)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("Pactum")
}

/// Runtime configuration, constructed once at process entry and passed by
/// reference into each component. No module-level mutable state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Inference provider base URL (file ingestion + responses endpoints).
    pub provider_base_url: String,
    /// Bearer credential for the provider.
    pub provider_api_key: String,
    /// Model name sent with every inference request.
    pub provider_model: String,
    /// Export sink endpoint; empty disables export.
    pub export_url: String,
    /// SQLite status store path.
    pub db_path: PathBuf,
    /// Root directory of the blob store (bucket dirs live under it).
    pub blob_root: PathBuf,
    /// Bucket name contract uploads are stored under.
    pub upload_bucket: String,
    /// HTTP listen address for the API surface.
    pub bind_addr: String,
    /// Timeout for provider and export calls, in seconds.
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Build the configuration from the environment, falling back to local
    /// defaults under the app data directory.
    pub fn from_env() -> Self {
        let data_dir = app_data_dir();
        Self {
            provider_base_url: env_or("PACTUM_PROVIDER_URL", "https://api.openai.com/v1"),
            provider_api_key: env_or("PACTUM_PROVIDER_API_KEY", ""),
            provider_model: env_or("PACTUM_PROVIDER_MODEL", "gpt-4o-mini"),
            export_url: env_or("PACTUM_EXPORT_URL", ""),
            db_path: std::env::var("PACTUM_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("pactum.db")),
            blob_root: std::env::var("PACTUM_BLOB_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("blobs")),
            upload_bucket: env_or("PACTUM_UPLOAD_BUCKET", "contracts"),
            bind_addr: env_or("PACTUM_BIND_ADDR", "127.0.0.1:8710"),
            request_timeout_secs: std::env::var("PACTUM_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        }
    }

    /// Self-contained configuration for tests: no environment reads, no
    /// real endpoints.
    #[cfg(test)]
    pub fn default_for_tests() -> Self {
        Self {
            provider_base_url: "http://127.0.0.1:1/v1".to_string(),
            provider_api_key: "test-key".to_string(),
            provider_model: "test-model".to_string(),
            export_url: "http://127.0.0.1:1/export".to_string(),
            db_path: PathBuf::from(":memory:"),
            blob_root: std::env::temp_dir(),
            upload_bucket: "contracts".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            request_timeout_secs: 5,
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
