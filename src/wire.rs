//! JSON shapes of the analyze-text jobs API.
//!
//! Request bodies are typed. Poll responses are walked as `serde_json::Value`
//! so that every missing segment of the nested result path turns into a
//! `ResultFormat` error instead of a deserialisation failure.

use crate::error::SummarizeError;
use crate::summary::SummaryRequest;
use serde::Serialize;
use serde_json::Value;

/// Task kind for extractive summarisation
pub const EXTRACTIVE_SUMMARIZATION: &str = "ExtractiveSummarization";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeJobBody<'a> {
    analysis_input: AnalysisInput<'a>,
    tasks: Vec<TaskDescriptor>,
}

#[derive(Debug, Serialize)]
struct AnalysisInput<'a> {
    documents: Vec<InputDocument<'a>>,
}

#[derive(Debug, Serialize)]
struct InputDocument<'a> {
    id: &'a str,
    language: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct TaskDescriptor {
    kind: &'static str,
    parameters: TaskParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskParameters {
    sentence_count: u32,
}

impl<'a> AnalyzeJobBody<'a> {
    pub fn from_request(request: &'a SummaryRequest) -> Self {
        Self {
            analysis_input: AnalysisInput {
                documents: vec![InputDocument {
                    id: request.document_id(),
                    language: request.language(),
                    text: request.document_text(),
                }],
            },
            tasks: vec![TaskDescriptor {
                kind: EXTRACTIVE_SUMMARIZATION,
                parameters: TaskParameters {
                    sentence_count: request.sentence_count(),
                },
            }],
        }
    }
}

/// State of a submitted job as reported by the poll endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Map a wire status string. Unrecognised values yield `None`.
    pub fn from_wire(status: &str) -> Option<Self> {
        match status {
            "notStarted" | "running" | "cancelling" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" | "cancelled" | "partiallyCompleted" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// Read and map the `status` field of a poll body
pub fn job_status(body: &Value) -> Result<JobStatus, SummarizeError> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| SummarizeError::ResultFormat("missing job status".to_string()))?;

    JobStatus::from_wire(status)
        .ok_or_else(|| SummarizeError::ResultFormat(format!("unrecognised job status '{status}'")))
}

/// First service-reported error message on a failed job, if any
pub fn job_error_message(body: &Value) -> Option<String> {
    body.get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// `error.message` of an error response body, if present
pub fn error_message(body: &Value) -> Option<String> {
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Pull the ordered sentence texts out of a succeeded job body.
///
/// Path: `tasks.items[0].results.documents[0].sentences[*].text`
pub fn extract_sentences(body: &Value) -> Result<Vec<String>, SummarizeError> {
    let missing = |segment: &str| SummarizeError::ResultFormat(format!("missing '{segment}'"));

    let document = body
        .get("tasks")
        .ok_or_else(|| missing("tasks"))?
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("tasks.items"))?
        .first()
        .ok_or_else(|| missing("tasks.items[0]"))?
        .get("results")
        .ok_or_else(|| missing("results"))?
        .get("documents")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("results.documents"))?
        .first()
        .ok_or_else(|| missing("results.documents[0]"))?;

    let sentences = document
        .get("sentences")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("sentences"))?;

    if sentences.is_empty() {
        return Err(SummarizeError::ResultFormat(
            "service returned no sentences".to_string(),
        ));
    }

    sentences
        .iter()
        .map(|s| {
            s.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| missing("sentences[].text"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::SummaryLength;
    use serde_json::json;

    #[test]
    fn serialises_job_body() {
        let request = SummaryRequest::new("Hello world.", SummaryLength::Short).unwrap();
        let body = serde_json::to_value(AnalyzeJobBody::from_request(&request)).unwrap();

        assert_eq!(
            body,
            json!({
                "analysisInput": {
                    "documents": [{ "id": "1", "language": "en", "text": "Hello world." }]
                },
                "tasks": [{
                    "kind": "ExtractiveSummarization",
                    "parameters": { "sentenceCount": 3 }
                }]
            })
        );
    }

    #[test]
    fn extracts_sentences_in_order() {
        let body = json!({
            "status": "succeeded",
            "tasks": { "items": [{ "results": { "documents": [{
                "id": "1",
                "sentences": [{ "text": "A." }, { "text": "B." }]
            }] } }] }
        });

        assert_eq!(extract_sentences(&body).unwrap(), vec!["A.", "B."]);
    }

    #[test]
    fn missing_segments_are_format_errors() {
        let bodies = [
            json!({ "status": "succeeded" }),
            json!({ "tasks": { "items": [] } }),
            json!({ "tasks": { "items": [{ "results": {} }] } }),
            json!({ "tasks": { "items": [{ "results": { "documents": [] } }] } }),
            json!({ "tasks": { "items": [{ "results": { "documents": [{ "id": "1" }] } }] } }),
            json!({ "tasks": { "items": [{ "results": { "documents": [{ "sentences": [] }] } }] } }),
            json!({ "tasks": { "items": [{ "results": { "documents": [{ "sentences": [{}] }] } }] } }),
        ];

        for body in bodies {
            assert!(
                matches!(extract_sentences(&body), Err(SummarizeError::ResultFormat(_))),
                "expected format error for {body}"
            );
        }
    }

    #[test]
    fn maps_wire_statuses() {
        assert_eq!(job_status(&json!({ "status": "running" })).unwrap(), JobStatus::Running);
        assert_eq!(job_status(&json!({ "status": "notStarted" })).unwrap(), JobStatus::Running);
        assert_eq!(job_status(&json!({ "status": "succeeded" })).unwrap(), JobStatus::Succeeded);
        assert_eq!(job_status(&json!({ "status": "failed" })).unwrap(), JobStatus::Failed);
        assert_eq!(job_status(&json!({ "status": "cancelled" })).unwrap(), JobStatus::Failed);
        assert!(matches!(
            job_status(&json!({ "status": "exploded" })),
            Err(SummarizeError::ResultFormat(_))
        ));
        assert!(matches!(job_status(&json!({})), Err(SummarizeError::ResultFormat(_))));
    }

    #[test]
    fn reads_service_messages() {
        assert_eq!(
            error_message(&json!({ "error": { "message": "Access denied" } })),
            Some("Access denied".to_string())
        );
        assert_eq!(error_message(&json!({})), None);
        assert_eq!(
            job_error_message(&json!({ "errors": [{ "message": "Document too long" }] })),
            Some("Document too long".to_string())
        );
        assert_eq!(job_error_message(&json!({ "errors": [] })), None);
    }
}
