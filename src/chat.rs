use crate::adapters::LlmClient;
use crate::errors::{AppError, AppResult};
use crate::harness::prompt::chat_prompt;
use crate::harness::structured_output::{
    resolve_structured_output, schema_violations, string_field,
};
use crate::models::{
    AppSettings, ChatMessage, ChatTurn, LegalCase, LlmRequest, MessageDraft, MessageSender,
};
use crate::repo::{CaseRepo, DocumentRepo, MessageRepo};
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Fixed fallback reply: the transcript always gets a paired assistant
/// message, even when the model call fails outright.
pub const ASSISTANT_APOLOGY: &str =
    "I apologize, but I'm having trouble processing your request right now. Please try again.";

const UPDATABLE_CASE_FIELDS: [&str; 4] = ["deadline", "priority", "status", "jurisdiction"];

/// One chat turn: the user message is persisted before the model is
/// invoked and survives regardless of what happens afterwards.
pub(crate) async fn run_chat_turn(
    cases: &CaseRepo,
    documents: &DocumentRepo,
    messages: &MessageRepo,
    llm: &Arc<dyn LlmClient>,
    settings: &AppSettings,
    case_id: &str,
    user_text: &str,
) -> AppResult<ChatTurn> {
    let user_text = user_text.trim();
    if user_text.is_empty() {
        return Err(AppError::Validation("Message must not be empty".to_string()));
    }
    let case = cases
        .get(case_id)?
        .ok_or_else(|| AppError::NotFound(format!("No case with id {case_id}")))?;
    let case_documents = documents.filter(json!({ "case_id": case_id }), Some("-created_date"))?;

    let user_message =
        messages.create(&MessageDraft::text(case_id, user_text, MessageSender::User))?;

    let response_schema = chat_response_schema();
    let request = LlmRequest {
        prompt: chat_prompt(&case, &case_documents, user_text),
        response_json_schema: Some(response_schema.clone()),
        add_context_from_internet: settings.add_context_from_internet,
    };

    let reply = match llm.invoke(&request).await {
        Ok(reply) => resolve_structured_output(reply),
        Err(error) => {
            tracing::warn!(case_id, error = %error, "assistant call failed");
            return apology_turn(messages, case_id, user_message, case);
        }
    };

    let violations = schema_violations(&reply, &response_schema);
    if !violations.is_empty() {
        tracing::warn!(case_id, ?violations, "assistant reply does not match the requested schema");
    }

    match compose_reply(cases, case_id, case.clone(), &reply) {
        Ok((content, case, applied_updates)) => {
            let assistant_message = messages.create(&MessageDraft::text(
                case_id,
                content,
                MessageSender::Assistant,
            ))?;
            Ok(ChatTurn {
                user_message,
                assistant_message,
                case,
                applied_updates,
            })
        }
        Err(error) => {
            tracing::warn!(case_id, error = %error, "failed to process assistant reply");
            apology_turn(messages, case_id, user_message, case)
        }
    }
}

fn apology_turn(
    messages: &MessageRepo,
    case_id: &str,
    user_message: ChatMessage,
    case: LegalCase,
) -> AppResult<ChatTurn> {
    let assistant_message = messages.create(&MessageDraft::text(
        case_id,
        ASSISTANT_APOLOGY,
        MessageSender::Assistant,
    ))?;
    Ok(ChatTurn {
        user_message,
        assistant_message,
        case,
        applied_updates: None,
    })
}

/// Builds the assistant message from the reply: response text, optional
/// jurisdiction analysis, then any case-field updates with a readable
/// summary of what changed.
fn compose_reply(
    cases: &CaseRepo,
    case_id: &str,
    mut case: LegalCase,
    reply: &Value,
) -> AppResult<(String, LegalCase, Option<Value>)> {
    let response_text = string_field(reply, "response_text").ok_or_else(|| {
        AppError::Collaborator("assistant reply is missing response_text".to_string())
    })?;
    let mut content = response_text.to_string();

    if let Some(analysis) = reply.get("jurisdiction_analysis") {
        if let Some(reasoning) = string_field(analysis, "reasoning") {
            let proper = string_field(analysis, "proper_jurisdiction")
                .unwrap_or_default()
                .to_uppercase();
            content.push_str(&format!(
                "\n\nJURISDICTION ANALYSIS:\nProper jurisdiction: {proper}\nReasoning: {reasoning}"
            ));
        }
    }

    let updates = case_field_updates(reply);
    let mut applied_updates = None;
    if !updates.is_empty() {
        let patch = Value::Object(updates.clone());
        case = cases.update(case_id, patch.clone())?;
        content.push_str(&format!(
            "\n\n*System Update: I've updated the case {}.*",
            update_summary(&updates)
        ));
        applied_updates = Some(patch);
    }

    Ok((content, case, applied_updates))
}

/// The reply may only touch deadline, priority, status, and jurisdiction;
/// anything else (and null values) is dropped.
fn case_field_updates(reply: &Value) -> Map<String, Value> {
    let mut updates = Map::new();
    let Some(requested) = reply.get("updated_case_data").and_then(Value::as_object) else {
        return updates;
    };
    for field in UPDATABLE_CASE_FIELDS {
        if let Some(value) = requested.get(field) {
            if !value.is_null() {
                updates.insert(field.to_string(), value.clone());
            }
        }
    }
    updates
}

fn update_summary(updates: &Map<String, Value>) -> String {
    updates
        .iter()
        .map(|(field, value)| {
            let rendered = value.as_str().map(ToString::to_string).unwrap_or_else(|| value.to_string());
            if field == "deadline" {
                if let Some(pretty) = format_deadline(&rendered) {
                    return format!("deadline to {pretty}");
                }
            }
            format!("{field} to \"{rendered}\"")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_deadline(value: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    Some(date.format("%B %-d, %Y").to_string())
}

fn chat_response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "jurisdiction_analysis": {
                "type": "object",
                "properties": {
                    "federal_indicators_found": { "type": "array", "items": { "type": "string" } },
                    "proper_jurisdiction": { "type": "string", "enum": ["federal", "state", "uncertain"] },
                    "reasoning": { "type": "string" }
                }
            },
            "response_text": { "type": "string" },
            "updated_case_data": {
                "type": "object",
                "properties": {
                    "deadline": { "type": "string", "format": "date" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high", "urgent"] },
                    "status": {
                        "type": "string",
                        "enum": ["active", "research", "drafting", "filing", "completed", "closed"]
                    },
                    "jurisdiction": { "type": "string" }
                }
            }
        },
        "required": ["response_text"]
    })
}
