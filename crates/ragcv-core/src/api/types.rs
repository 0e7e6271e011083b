use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize)]
pub(crate) struct QueryRequest<'a> {
    pub text: &'a str,
}

#[derive(Serialize)]
pub(crate) struct CompileRequest<'a> {
    pub latex: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LogsResponse {
    pub logs: String,
}

/// FastAPI error body; `detail` is a string for handler errors and a list for
/// request validation errors.
#[derive(Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Value,
}

/// A retrieved chunk that grounded the generated draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub retrieval_score: f64,
    #[serde(default)]
    pub chunk_length_tokens: i64,
    #[serde(default)]
    pub source: Option<String>,
    /// Whatever else the retriever attached to the chunk metadata
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Response of the query endpoint: the generated draft plus what it was built from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResult {
    pub result: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "retrieved_artifacts")]
    pub artifacts: Vec<Artifact>,
}

impl GeneratedResult {
    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_backend_response_with_retrieved_artifacts() {
        let body = r#"{
            "result": "Dear Hiring Manager,",
            "summary": "Backend role, Rust + Postgres",
            "retrieved_artifacts": [
                {"text": "Led migration to Rust", "retrieval_score": 0.82,
                 "chunk_length_tokens": 41, "source": "cv.md", "section": "experience"}
            ]
        }"#;

        let parsed: GeneratedResult = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.result, "Dear Hiring Manager,");
        assert_eq!(parsed.summary_text(), "Backend role, Rust + Postgres");
        assert_eq!(parsed.artifacts.len(), 1);

        let artifact = &parsed.artifacts[0];
        assert_eq!(artifact.chunk_length_tokens, 41);
        assert!((artifact.retrieval_score - 0.82).abs() < 1e-9);
        assert_eq!(artifact.source.as_deref(), Some("cv.md"));
        assert_eq!(artifact.metadata.get("section"), Some(&Value::from("experience")));
    }

    #[test]
    fn test_optional_fields_default() {
        let parsed: GeneratedResult = serde_json::from_str(r#"{"result": "hi"}"#).unwrap();
        assert_eq!(parsed.summary, None);
        assert_eq!(parsed.summary_text(), "");
        assert!(parsed.artifacts.is_empty());

        let parsed: GeneratedResult =
            serde_json::from_str(r#"{"result": "hi", "artifacts": [{"text": "chunk"}]}"#).unwrap();
        assert_eq!(parsed.artifacts[0].text, "chunk");
        assert_eq!(parsed.artifacts[0].source, None);
    }

    #[test]
    fn test_compile_request_uses_latex_key() {
        let body = serde_json::to_value(CompileRequest { latex: "\\relax" }).unwrap();
        assert_eq!(body, serde_json::json!({"latex": "\\relax"}));
    }
}
