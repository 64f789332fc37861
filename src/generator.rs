use crate::adapters::LlmClient;
use crate::errors::{AppError, AppResult};
use crate::harness::prompt::generator_prompt;
use crate::models::{GenerateDocumentRequest, GeneratedDocument, LlmRequest};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Drafts a standalone legal document. The model is invoked without a
/// response schema and without external knowledge; the drafted text comes
/// back verbatim. Nothing is persisted.
pub(crate) async fn run_generator(
    llm: &Arc<dyn LlmClient>,
    request: &GenerateDocumentRequest,
) -> AppResult<GeneratedDocument> {
    if request.details.trim().is_empty() {
        return Err(AppError::Validation(
            "Document details are required".to_string(),
        ));
    }

    let llm_request = LlmRequest {
        prompt: generator_prompt(request),
        response_json_schema: None,
        add_context_from_internet: false,
    };
    let reply = llm.invoke(&llm_request).await.map_err(AppError::from)?;

    let content = match reply {
        Value::String(text) => text,
        other => serde_json::to_string_pretty(&other)?,
    };
    if content.trim().is_empty() {
        return Err(AppError::Collaborator(
            "model returned an empty document".to_string(),
        ));
    }

    Ok(GeneratedDocument {
        document_type: request.document_type,
        content,
        generated_at: Utc::now(),
    })
}
