//! HTTP client for the AI provider plus the test double.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use super::error::PipelineError;
use super::traits::InferenceProvider;
use crate::config::AppConfig;

/// Blocking HTTP client against an OpenAI-compatible provider.
///
/// Two endpoints are used: `POST /files` (multipart ingestion, purpose
/// `assistants`) and `POST /responses` (extraction against an uploaded
/// file). File release goes through `DELETE /files/{id}`.
pub struct HttpProvider {
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl HttpProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.provider_base_url.trim_end_matches('/').to_string(),
            api_key: config.provider_api_key.clone(),
            model: config.provider_model.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    /// Built per call: a blocking client owns a private runtime that must
    /// be created and dropped on a blocking-capable thread. The provider
    /// struct itself carries no runtime state, so it can live in (and drop
    /// from) async server state safely.
    fn http_client(&self) -> Result<reqwest::blocking::Client, reqwest::Error> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
    }

    fn transport_error(e: &reqwest::Error) -> String {
        if e.is_connect() {
            format!("Cannot reach provider: {}", e)
        } else if e.is_timeout() {
            format!("Provider request timed out: {}", e)
        } else {
            format!("Provider request failed: {}", e)
        }
    }
}

impl InferenceProvider for HttpProvider {
    fn upload_file(&self, filename: &str, bytes: &[u8]) -> Result<String, PipelineError> {
        let part = reqwest::blocking::multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(|e| PipelineError::ProviderUpload(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let client = self
            .http_client()
            .map_err(|e| PipelineError::ProviderUpload(format!("HTTP client build failed: {}", e)))?;
        let response = client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| PipelineError::ProviderUpload(Self::transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| PipelineError::ProviderUpload(e.to_string()))?;

        if !status.is_success() {
            return Err(PipelineError::ProviderUpload(format!(
                "File upload rejected ({}): {}",
                status, body
            )));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| PipelineError::ProviderUpload(format!("Malformed upload response: {}", e)))?;
        let handle = parsed
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                PipelineError::ProviderUpload("Upload response missing file id".to_string())
            })?;

        debug!(filename = %filename, handle = %handle, "File uploaded to provider");
        Ok(handle.to_string())
    }

    fn extract(&self, file_handle: &str, prompt: &str) -> Result<String, PipelineError> {
        let request_body = json!({
            "model": self.model,
            "input": [{
                "role": "user",
                "content": [
                    { "type": "input_file", "file_id": file_handle },
                    { "type": "input_text", "text": prompt }
                ]
            }]
        });

        let client = self.http_client().map_err(|e| {
            PipelineError::ProviderInference(format!("HTTP client build failed: {}", e))
        })?;
        let response = client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .map_err(|e| PipelineError::ProviderInference(Self::transport_error(&e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| PipelineError::ProviderInference(e.to_string()))?;

        if !status.is_success() {
            return Err(PipelineError::ProviderInference(format!(
                "Inference rejected ({}): {}",
                status, body
            )));
        }

        let parsed: Value = serde_json::from_str(&body).map_err(|e| {
            PipelineError::ProviderInference(format!("Malformed inference response: {}", e))
        })?;

        extract_output_text(&parsed).ok_or_else(|| {
            PipelineError::ProviderInference(
                "Inference response carried no output text".to_string(),
            )
        })
    }

    fn delete_file(&self, file_handle: &str) -> Result<(), PipelineError> {
        let client = self
            .http_client()
            .map_err(|e| PipelineError::FileRelease(format!("HTTP client build failed: {}", e)))?;
        let response = client
            .delete(format!("{}/files/{}", self.base_url, file_handle))
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| PipelineError::FileRelease(Self::transport_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PipelineError::FileRelease(format!(
                "File delete rejected ({}): {}",
                status, body
            )));
        }

        debug!(handle = %file_handle, "Provider file released");
        Ok(())
    }
}

/// Pull the model's text out of a provider response envelope.
///
/// Handles the Responses-API shape (`output` array of messages with
/// `output_text` content items, or a top-level `output_text` convenience
/// field) and falls back to the chat-completions shape
/// (`choices[0].message.content`).
fn extract_output_text(envelope: &Value) -> Option<String> {
    if let Some(text) = envelope.get("output_text").and_then(|v| v.as_str()) {
        if !text.trim().is_empty() {
            return Some(text.to_string());
        }
    }

    if let Some(output) = envelope.get("output").and_then(|v| v.as_array()) {
        let mut collected = String::new();
        for item in output {
            if item.get("type").and_then(|v| v.as_str()) != Some("message") {
                continue;
            }
            if let Some(content) = item.get("content").and_then(|v| v.as_array()) {
                for part in content {
                    if part.get("type").and_then(|v| v.as_str()) == Some("output_text") {
                        if let Some(text) = part.get("text").and_then(|v| v.as_str()) {
                            collected.push_str(text);
                        }
                    }
                }
            }
        }
        if !collected.trim().is_empty() {
            return Some(collected);
        }
    }

    envelope
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .filter(|text| !text.trim().is_empty())
        .map(|text| text.to_string())
}

// ═══════════════════════════════════════════════════════════════════════
// Test double
// ═══════════════════════════════════════════════════════════════════════

/// In-memory provider for pipeline tests. Records uploads and deletions,
/// answers extraction from a canned per-filename response map.
pub struct MockProvider {
    default_response: String,
    responses_by_file: Mutex<HashMap<String, String>>,
    uploads: Mutex<Vec<String>>,
    deletions: Mutex<Vec<String>>,
    fail_upload: bool,
    fail_inference: bool,
}

impl MockProvider {
    pub fn new(default_response: impl Into<String>) -> Self {
        Self {
            default_response: default_response.into(),
            responses_by_file: Mutex::new(HashMap::new()),
            uploads: Mutex::new(Vec::new()),
            deletions: Mutex::new(Vec::new()),
            fail_upload: false,
            fail_inference: false,
        }
    }

    /// Provider whose uploads always fail.
    pub fn failing_upload() -> Self {
        let mut provider = Self::new("");
        provider.fail_upload = true;
        provider
    }

    /// Provider whose inference always fails.
    pub fn failing_inference() -> Self {
        let mut provider = Self::new("");
        provider.fail_inference = true;
        provider
    }

    /// Canned response for files uploaded under the given filename.
    pub fn with_response_for(self, filename: &str, response: impl Into<String>) -> Self {
        self.responses_by_file
            .lock()
            .expect("mock lock poisoned")
            .insert(format!("file-{}", filename), response.into());
        self
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().expect("mock lock poisoned").clone()
    }

    pub fn deletions(&self) -> Vec<String> {
        self.deletions.lock().expect("mock lock poisoned").clone()
    }
}

impl InferenceProvider for MockProvider {
    fn upload_file(&self, filename: &str, _bytes: &[u8]) -> Result<String, PipelineError> {
        if self.fail_upload {
            return Err(PipelineError::ProviderUpload(
                "mock upload failure".to_string(),
            ));
        }
        let handle = format!("file-{}", filename);
        self.uploads
            .lock()
            .expect("mock lock poisoned")
            .push(handle.clone());
        Ok(handle)
    }

    fn extract(&self, file_handle: &str, _prompt: &str) -> Result<String, PipelineError> {
        if self.fail_inference {
            return Err(PipelineError::ProviderInference(
                "mock inference failure".to_string(),
            ));
        }
        let responses = self.responses_by_file.lock().expect("mock lock poisoned");
        Ok(responses
            .get(file_handle)
            .cloned()
            .unwrap_or_else(|| self.default_response.clone()))
    }

    fn delete_file(&self, file_handle: &str) -> Result<(), PipelineError> {
        self.deletions
            .lock()
            .expect("mock lock poisoned")
            .push(file_handle.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_responses_api_output() {
        let envelope = json!({
            "output": [{
                "type": "message",
                "content": [
                    { "type": "output_text", "text": "[{\"text\": \"Pay rent\"}]" }
                ]
            }]
        });
        assert_eq!(
            extract_output_text(&envelope).unwrap(),
            "[{\"text\": \"Pay rent\"}]"
        );
    }

    #[test]
    fn extracts_top_level_output_text() {
        let envelope = json!({ "output_text": "hello" });
        assert_eq!(extract_output_text(&envelope).unwrap(), "hello");
    }

    #[test]
    fn extracts_chat_completions_fallback() {
        let envelope = json!({
            "choices": [{ "message": { "content": "fallback text" } }]
        });
        assert_eq!(extract_output_text(&envelope).unwrap(), "fallback text");
    }

    #[test]
    fn rejects_envelope_without_text() {
        let envelope = json!({ "output": [], "usage": { "total_tokens": 10 } });
        assert!(extract_output_text(&envelope).is_none());
    }

    #[test]
    fn concatenates_multiple_output_text_parts() {
        let envelope = json!({
            "output": [{
                "type": "message",
                "content": [
                    { "type": "output_text", "text": "part one " },
                    { "type": "output_text", "text": "part two" }
                ]
            }]
        });
        assert_eq!(extract_output_text(&envelope).unwrap(), "part one part two");
    }

    #[test]
    fn mock_records_uploads_and_deletions() {
        let provider = MockProvider::new("[]");
        let handle = provider.upload_file("lease.pdf", b"%PDF").unwrap();
        assert_eq!(handle, "file-lease.pdf");
        provider.delete_file(&handle).unwrap();
        assert_eq!(provider.uploads(), vec!["file-lease.pdf"]);
        assert_eq!(provider.deletions(), vec!["file-lease.pdf"]);
    }

    #[test]
    fn mock_serves_per_file_responses() {
        let provider =
            MockProvider::new("default").with_response_for("lease.pdf", "specific");
        let handle = provider.upload_file("lease.pdf", b"%PDF").unwrap();
        assert_eq!(provider.extract(&handle, "prompt").unwrap(), "specific");
        assert_eq!(provider.extract("file-other.pdf", "prompt").unwrap(), "default");
    }
}
