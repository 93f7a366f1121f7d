//! Export of the consolidated registry to the document sink.

use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use super::consolidate::RegistryEntry;
use crate::config::AppConfig;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Registry is empty, nothing to export")]
    EmptyRegistry,

    #[error("Export sink unreachable: {0}")]
    Transport(String),

    #[error("Export sink rejected the registry: {0}")]
    Rejected(String),

    #[error("Export sink response was malformed: {0}")]
    MalformedResponse(String),
}

/// Blocking client for the export sink.
pub struct ExportClient {
    endpoint: String,
    timeout: Duration,
}

impl ExportClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            endpoint: config.export_url.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Built per call so the blocking client's private runtime is created
    /// and dropped on the calling blocking thread, never in async state.
    fn http_client(&self) -> Result<reqwest::blocking::Client, ExportError> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ExportError::Transport(format!("HTTP client build failed: {}", e)))
    }

    /// Export a consolidated registry under the given display name.
    /// Returns the sink's document URL.
    ///
    /// An empty registry is rejected locally; the sink is never called.
    pub fn export(
        &self,
        full_name: &str,
        entries: &[RegistryEntry],
    ) -> Result<String, ExportError> {
        if entries.is_empty() {
            return Err(ExportError::EmptyRegistry);
        }

        let body = json!({
            "full_name": full_name,
            "content": entries,
        });

        let response = self
            .http_client()?
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    ExportError::Transport(format!("Cannot reach export sink: {}", e))
                } else if e.is_timeout() {
                    ExportError::Transport(format!("Export request timed out: {}", e))
                } else {
                    ExportError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ExportError::Rejected(format!("({}) {}", status, text)));
        }

        let parsed: Value = serde_json::from_str(&text)
            .map_err(|e| ExportError::MalformedResponse(e.to_string()))?;
        let url = parsed
            .get("documentUrl")
            .or_else(|| parsed.get("url"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ExportError::MalformedResponse("response carried no document URL".to_string())
            })?;

        info!(entries = entries.len(), url = %url, "Registry exported");
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> ExportClient {
        let mut config = AppConfig::default_for_tests();
        // Unroutable address: any network attempt would fail fast, the
        // empty-registry check must trip before that.
        config.export_url = "http://127.0.0.1:1/export".to_string();
        ExportClient::new(&config)
    }

    #[test]
    fn empty_registry_is_rejected_locally() {
        let client = test_client();
        let err = client.export("Jane Doe", &[]).unwrap_err();
        assert!(matches!(err, ExportError::EmptyRegistry));
    }
}
