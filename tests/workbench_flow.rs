use async_trait::async_trait;
use base64::Engine;
use local_case_webapp::adapters::{ContentExtractor, FileStorage, LlmClient};
use local_case_webapp::errors::AppError;
use local_case_webapp::intake::{IntakeResult, StageStatus};
use local_case_webapp::models::{
    AttachDocumentPayload, CasePriority, CaseStatus, CreateCaseRequest, DocumentCategory,
    DocumentType, ExtractionResult, ExtractionStatus, GenerateDocumentRequest, IncomingFile,
    LlmRequest, MessageSender, UploadedFile,
};
use local_case_webapp::store::SqliteBackend;
use local_case_webapp::{Workbench, ASSISTANT_APOLOGY};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct StaticStorage;

#[async_trait]
impl FileStorage for StaticStorage {
    async fn upload(&self, file: &IncomingFile) -> anyhow::Result<UploadedFile> {
        Ok(UploadedFile {
            file_url: format!("mem://{}", file.name),
        })
    }
}

struct FailingStorage;

#[async_trait]
impl FileStorage for FailingStorage {
    async fn upload(&self, _file: &IncomingFile) -> anyhow::Result<UploadedFile> {
        anyhow::bail!("network down")
    }
}

struct SelectiveExtractor {
    content: String,
    fail_matching: Option<String>,
}

impl SelectiveExtractor {
    fn succeeding(content: &str) -> Arc<Self> {
        Arc::new(Self {
            content: content.to_string(),
            fail_matching: None,
        })
    }

    fn failing_for(content: &str, pattern: &str) -> Arc<Self> {
        Arc::new(Self {
            content: content.to_string(),
            fail_matching: Some(pattern.to_string()),
        })
    }
}

#[async_trait]
impl ContentExtractor for SelectiveExtractor {
    async fn extract(&self, file_url: &str, _output_schema: &Value) -> anyhow::Result<ExtractionResult> {
        if let Some(pattern) = &self.fail_matching {
            if file_url.contains(pattern) {
                anyhow::bail!("unreadable scan")
            }
        }
        Ok(ExtractionResult {
            status: ExtractionStatus::Success,
            output: Some(json!({ "content": self.content })),
        })
    }
}

struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<Value, String>>>,
}

impl ScriptedLlm {
    fn new(replies: Vec<Result<Value, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
        })
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn invoke(&self, _request: &LlmRequest) -> anyhow::Result<Value> {
        match self.replies.lock().expect("llm lock").pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => anyhow::bail!(message),
            None => anyhow::bail!("no scripted reply left"),
        }
    }
}

fn workbench_with(
    storage: Arc<dyn FileStorage>,
    extractor: Arc<dyn ContentExtractor>,
    llm: Arc<dyn LlmClient>,
) -> (Workbench, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(SqliteBackend::new(&dir.path().join("state.sqlite")).expect("backend"));
    let workbench = Workbench::new(backend, storage, extractor, llm);
    workbench
        .update_settings(json!({ "redirect_delay_ms": 0 }))
        .expect("settings");
    (workbench, dir)
}

fn attachment(name: &str, size: u64) -> IncomingFile {
    let encoded = base64::engine::general_purpose::STANDARD.encode("file body");
    IncomingFile {
        name: name.to_string(),
        mime_type: "application/octet-stream".to_string(),
        size,
        data_url: format!("data:application/octet-stream;base64,{encoded}"),
    }
}

fn structuring_reply() -> Value {
    json!({
        "title": "Security deposit dispute",
        "case_type": "contract_dispute",
        "description": "Landlord kept the full deposit after move-out",
        "jurisdiction": "California",
        "priority": "high",
        "status": "closed"
    })
}

#[tokio::test]
async fn intake_with_documents_creates_case_and_documents() {
    let llm = ScriptedLlm::new(vec![Ok(structuring_reply())]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::failing_for("Lease terms and conditions", "photo"),
        llm,
    );

    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "My landlord kept my deposit".to_string(),
                files: vec![attachment("lease.pdf", 2048), attachment("photo.jpg", 2048)],
            },
            Some(sender),
        )
        .await
        .expect("intake run");

    assert!(outcome.file_errors.is_empty());
    assert!(outcome.warnings.is_empty());
    assert!(outcome
        .stages
        .iter()
        .all(|stage| stage.status == StageStatus::Complete));

    let IntakeResult::Completed { case, documents } = outcome.result else {
        panic!("intake should complete");
    };
    assert_eq!(case.status, CaseStatus::Active);
    assert_eq!(case.priority, CasePriority::High);
    assert_eq!(documents.len(), 2);

    let lease = documents
        .iter()
        .find(|document| document.title == "lease")
        .expect("lease document");
    assert_eq!(lease.file_type, "pdf");
    assert_eq!(lease.extracted_content, "Lease terms and conditions");

    let photo = documents
        .iter()
        .find(|document| document.title == "photo")
        .expect("photo document");
    assert_eq!(
        photo.extracted_content,
        "[Content extraction failed for photo.jpg]"
    );

    let first = receiver.recv().await.expect("first progress snapshot");
    assert_eq!(first.stages.len(), 1);
    assert_eq!(first.stages[0].status, StageStatus::Processing);
    let mut last = first;
    while let Ok(snapshot) = receiver.try_recv() {
        last = snapshot;
    }
    assert_eq!(last.stages.len(), 5);
    assert!(last
        .stages
        .iter()
        .all(|stage| stage.status == StageStatus::Complete));
}

#[tokio::test]
async fn oversized_file_is_excluded_but_the_run_proceeds() {
    let llm = ScriptedLlm::new(vec![Ok(structuring_reply())]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("Readable content"),
        llm,
    );

    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "Deposit issue with attachments".to_string(),
                files: vec![
                    attachment("notes.txt", 512),
                    attachment("scan.pdf", 11 * 1024 * 1024),
                ],
            },
            None,
        )
        .await
        .expect("intake run");

    assert_eq!(outcome.file_errors.len(), 1);
    assert!(outcome.file_errors[0].starts_with("scan.pdf"));

    let IntakeResult::Completed { documents, .. } = outcome.result else {
        panic!("intake should complete");
    };
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].title, "notes");
}

#[tokio::test]
async fn upload_failure_aborts_without_creating_a_case() {
    let llm = ScriptedLlm::new(vec![Ok(structuring_reply())]);
    let (workbench, _dir) = workbench_with(
        Arc::new(FailingStorage),
        SelectiveExtractor::succeeding("unused"),
        llm,
    );

    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "This run should abort".to_string(),
                files: vec![attachment("lease.pdf", 2048)],
            },
            None,
        )
        .await
        .expect("intake run");

    let IntakeResult::Failed { stage, message } = outcome.result else {
        panic!("intake should fail");
    };
    assert_eq!(stage, "Uploading documents...");
    assert!(message.contains("Failed to upload documents"));
    assert!(workbench.list_cases(None).expect("list").is_empty());
}

#[tokio::test]
async fn intake_without_files_enforces_active_status() {
    let reply = json!({
        "title": "Visa renewal",
        "case_type": "immigration",
        "status": "drafting"
    });
    let llm = ScriptedLlm::new(vec![Ok(reply)]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("unused"),
        llm,
    );

    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "Work visa expires in ninety days".to_string(),
                files: vec![],
            },
            None,
        )
        .await
        .expect("intake run");

    let cases = workbench.list_cases(None).expect("list");
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].status, CaseStatus::Active);
    assert_eq!(outcome.case().expect("case").id, cases[0].id);
}

#[tokio::test]
async fn intake_fails_when_the_model_omits_required_fields() {
    let llm = ScriptedLlm::new(vec![Ok(json!({ "description": "no title, no type" }))]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("unused"),
        llm,
    );

    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "Please structure this".to_string(),
                files: vec![],
            },
            None,
        )
        .await
        .expect("intake run");

    let IntakeResult::Failed { stage, message } = outcome.result else {
        panic!("intake should fail");
    };
    assert_eq!(stage, "AI is structuring your case...");
    assert!(message.contains("Missing title or case_type"));
    assert!(workbench.list_cases(None).expect("list").is_empty());
}

#[tokio::test]
async fn empty_description_is_rejected_before_any_stage() {
    let llm = ScriptedLlm::new(vec![]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("unused"),
        llm,
    );

    let error = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "   ".to_string(),
                files: vec![],
            },
            None,
        )
        .await
        .expect_err("should reject");
    assert!(matches!(error, AppError::Validation(_)));
}

#[tokio::test]
async fn chat_turn_applies_case_updates_and_summarizes_them() {
    let chat_reply = json!({
        "response_text": "You have a strong retaliation claim.",
        "jurisdiction_analysis": {
            "proper_jurisdiction": "federal",
            "reasoning": "OSHA retaliation is a federal matter."
        },
        "updated_case_data": { "priority": "urgent" }
    });
    let llm = ScriptedLlm::new(vec![Ok(structuring_reply()), Ok(chat_reply)]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("unused"),
        llm,
    );

    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "Deposit dispute".to_string(),
                files: vec![],
            },
            None,
        )
        .await
        .expect("intake run");
    let case_id = outcome.case().expect("case").id.clone();

    let turn = workbench
        .send_message(&case_id, "How urgent is this?")
        .await
        .expect("chat turn");

    assert_eq!(turn.case.priority, CasePriority::Urgent);
    assert_eq!(turn.case.title, "Security deposit dispute");
    assert!(turn.assistant_message.message.contains("JURISDICTION ANALYSIS:"));
    assert!(turn.assistant_message.message.contains("FEDERAL"));
    assert!(turn
        .assistant_message
        .message
        .contains("*System Update: I've updated the case priority to \"urgent\".*"));

    let workspace = workbench.load_case_workspace(&case_id).expect("workspace");
    assert_eq!(workspace.messages.len(), 2);
    assert_eq!(workspace.messages[0].sender, MessageSender::User);
    assert_eq!(workspace.messages[1].sender, MessageSender::Assistant);
    assert_eq!(workspace.case.priority, CasePriority::Urgent);
}

#[tokio::test]
async fn failed_chat_turn_persists_the_apology_and_changes_nothing() {
    let llm = ScriptedLlm::new(vec![
        Ok(structuring_reply()),
        Err("model unavailable".to_string()),
    ]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("unused"),
        llm,
    );

    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "Deposit dispute".to_string(),
                files: vec![],
            },
            None,
        )
        .await
        .expect("intake run");
    let case_before = outcome.case().expect("case").clone();

    let turn = workbench
        .send_message(&case_before.id, "Hello?")
        .await
        .expect("chat turn");
    assert_eq!(turn.assistant_message.message, ASSISTANT_APOLOGY);
    assert!(turn.applied_updates.is_none());

    let workspace = workbench
        .load_case_workspace(&case_before.id)
        .expect("workspace");
    assert_eq!(workspace.messages.len(), 2);
    assert_eq!(workspace.messages[1].message, ASSISTANT_APOLOGY);
    assert_eq!(workspace.case.priority, case_before.priority);
    assert_eq!(workspace.case.status, case_before.status);
    assert_eq!(workspace.case.deadline, case_before.deadline);
}

#[tokio::test]
async fn attach_document_then_cascade_delete() {
    let llm = ScriptedLlm::new(vec![Ok(structuring_reply())]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("Signed contract body"),
        llm,
    );

    let outcome = workbench
        .create_case_with_ai(
            CreateCaseRequest {
                description: "Deposit dispute".to_string(),
                files: vec![],
            },
            None,
        )
        .await
        .expect("intake run");
    let case_id = outcome.case().expect("case").id.clone();

    let document = workbench
        .attach_document(AttachDocumentPayload {
            case_id: case_id.clone(),
            file: attachment("contract.pdf", 4096),
            title: "Signed contract".to_string(),
            document_category: DocumentCategory::Contract,
        })
        .await
        .expect("attach");
    assert_eq!(document.case_id, case_id);
    assert_eq!(document.extracted_content, "Signed contract body");
    assert_eq!(document.document_category, DocumentCategory::Contract);

    let overview = workbench.case_overview().expect("overview");
    assert_eq!(overview.total_cases, 1);
    assert_eq!(overview.active_cases, 1);
    assert_eq!(overview.documents, 1);

    workbench.delete_case(&case_id).expect("delete");
    let overview = workbench.case_overview().expect("overview");
    assert_eq!(overview.total_cases, 0);
    assert_eq!(overview.documents, 0);
    assert_eq!(overview.messages, 0);

    let error = workbench
        .load_case_workspace(&case_id)
        .expect_err("workspace should be gone");
    assert!(matches!(error, AppError::NotFound(_)));
}

#[tokio::test]
async fn generator_returns_the_drafted_text() {
    let llm = ScriptedLlm::new(vec![Ok(json!(
        "DEMAND LETTER\n\nTo whom it may concern..."
    ))]);
    let (workbench, _dir) = workbench_with(
        Arc::new(StaticStorage),
        SelectiveExtractor::succeeding("unused"),
        llm,
    );

    let document = workbench
        .generate_document(&GenerateDocumentRequest {
            document_type: DocumentType::DemandLetter,
            parties: Some("Jordan Lee and Acme Property LLC".to_string()),
            jurisdiction: Some("California".to_string()),
            details: "Unpaid deposit of $2,400".to_string(),
            special_requirements: None,
        })
        .await
        .expect("generate");
    assert_eq!(document.document_type, DocumentType::DemandLetter);
    assert!(document.content.starts_with("DEMAND LETTER"));

    let error = workbench
        .generate_document(&GenerateDocumentRequest {
            document_type: DocumentType::Nda,
            parties: None,
            jurisdiction: None,
            details: "  ".to_string(),
            special_requirements: None,
        })
        .await
        .expect_err("should reject empty details");
    assert!(matches!(error, AppError::Validation(_)));
}
