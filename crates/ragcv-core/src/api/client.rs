use anyhow::{anyhow, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use super::types::{CompileRequest, ErrorBody, GeneratedResult, LogsResponse, QueryRequest};

/// HTTP client for the ragcv backend (`/query`, `/compile_latex`, `/logs`)
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(&self, text: &str) -> Result<GeneratedResult> {
        let url = format!("{}/query", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&QueryRequest { text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let result: GeneratedResult = response.json().await?;
        Ok(result)
    }

    /// Compiles LaTeX source; the success body is the rendered PDF
    pub async fn compile(&self, source: &str) -> Result<Vec<u8>> {
        let url = format!("{}/compile_latex", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&CompileRequest { latex: source })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let pdf = response.bytes().await?;
        Ok(pdf.to_vec())
    }

    /// Full snapshot of the server log, never a delta
    pub async fn fetch_logs(&self) -> Result<String> {
        let url = format!("{}/logs", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(failure(response).await);
        }

        let logs: LogsResponse = response.json().await?;
        Ok(logs.logs)
    }
}

async fn failure(response: Response) -> anyhow::Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    anyhow!(describe_failure(status, &body))
}

/// Prefers the server's own message so compile diagnostics reach the user verbatim.
fn describe_failure(status: StatusCode, body: &str) -> String {
    if let Ok(ErrorBody { detail }) = serde_json::from_str::<ErrorBody>(body) {
        match detail {
            Value::String(message) => return message,
            Value::Null => {}
            other => return other.to_string(),
        }
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    format!("Request failed with status: {}", status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_failure_uses_detail_string() {
        let message = describe_failure(
            StatusCode::BAD_REQUEST,
            r#"{"detail": "! Undefined control sequence."}"#,
        );
        assert_eq!(message, "! Undefined control sequence.");
    }

    #[test]
    fn test_describe_failure_serializes_structured_detail() {
        let message = describe_failure(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail": [{"loc": ["body", "text"], "msg": "field required"}]}"#,
        );
        assert!(message.contains("field required"));
    }

    #[test]
    fn test_describe_failure_falls_back_to_body_then_status() {
        assert_eq!(
            describe_failure(StatusCode::BAD_GATEWAY, "  upstream down \n"),
            "upstream down"
        );
        assert_eq!(
            describe_failure(StatusCode::REQUEST_TIMEOUT, ""),
            "Request failed with status: 408 Request Timeout"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = BackendClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
