use crate::adapters::{ContentExtractor, FileStorage, LlmClient};
use crate::errors::{AppError, AppResult};
use crate::harness::attachments::{file_extension, file_stem, validate_attachment};
use crate::harness::prompt::intake_prompt;
use crate::harness::structured_output::{
    resolve_structured_output, schema_violations, string_field,
};
use crate::models::{
    case_schema, AppSettings, CaseDocument, CaseDraft, CaseStatus, CaseType, CasePriority,
    CreateCaseRequest, DocumentCategory, DocumentDraft, IncomingFile, LegalCase, LlmRequest,
    UploadedFile,
};
use crate::repo::{CaseRepo, DocumentRepo};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const UNTITLED_CASE: &str = "Untitled Legal Case";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Processing,
    Complete,
    Error,
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageState {
    pub title: String,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Snapshot of every stage so far; one is emitted on each transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeProgress {
    pub stages: Vec<StageState>,
}

pub type ProgressSender = mpsc::UnboundedSender<IntakeProgress>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeOutcome {
    pub stages: Vec<StageState>,
    /// Per-file validation messages for attachments excluded before upload.
    pub file_errors: Vec<String>,
    /// Best-effort failures that did not abort the run.
    pub warnings: Vec<String>,
    pub result: IntakeResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntakeResult {
    Completed {
        case: LegalCase,
        documents: Vec<CaseDocument>,
    },
    Failed {
        stage: String,
        message: String,
    },
}

impl IntakeOutcome {
    pub fn case(&self) -> Option<&LegalCase> {
        match &self.result {
            IntakeResult::Completed { case, .. } => Some(case),
            IntakeResult::Failed { .. } => None,
        }
    }
}

/// Drives one case-creation run. Stages execute strictly in order; a fatal
/// stage failure aborts the run before any case record exists, so retry is
/// simply a fresh run.
pub(crate) struct IntakeRunner {
    cases: CaseRepo,
    documents: DocumentRepo,
    storage: Arc<dyn FileStorage>,
    extractor: Arc<dyn ContentExtractor>,
    llm: Arc<dyn LlmClient>,
    settings: AppSettings,
    progress: Option<ProgressSender>,
    stages: Vec<StageState>,
    warnings: Vec<String>,
}

impl IntakeRunner {
    pub fn new(
        cases: CaseRepo,
        documents: DocumentRepo,
        storage: Arc<dyn FileStorage>,
        extractor: Arc<dyn ContentExtractor>,
        llm: Arc<dyn LlmClient>,
        settings: AppSettings,
        progress: Option<ProgressSender>,
    ) -> Self {
        Self {
            cases,
            documents,
            storage,
            extractor,
            llm,
            settings,
            progress,
            stages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub async fn run(mut self, request: CreateCaseRequest) -> AppResult<IntakeOutcome> {
        let description = request.description.trim().to_string();
        if description.is_empty() {
            return Err(AppError::Validation(
                "Please provide a description for the legal issue.".to_string(),
            ));
        }

        let mut file_errors = Vec::new();
        let mut files: Vec<IncomingFile> = Vec::new();
        for file in request.files {
            let errors = validate_attachment(&file, &self.settings);
            if errors.is_empty() {
                files.push(file);
            } else {
                file_errors.extend(errors);
            }
        }

        let mut uploaded: Vec<UploadedFile> = Vec::new();
        let mut contents: Vec<String> = Vec::new();
        let mut content_blocks: Vec<String> = Vec::new();

        if !files.is_empty() {
            self.add_stage("Uploading documents...");
            match self.upload_all(&files).await {
                Ok(result) => {
                    uploaded = result;
                    self.complete_stage();
                }
                Err(error) => {
                    tracing::warn!(error = %error, "document upload failed");
                    self.fail_stage("Failed to upload one or more files");
                    return Ok(self.failed_outcome(
                        file_errors,
                        "Failed to upload documents. Please try again with smaller files \
                         or check your internet connection.",
                    ));
                }
            }

            self.add_stage("Analyzing document contents...");
            contents = self.extract_all(&files, &uploaded).await;
            for (index, content) in contents.iter().enumerate() {
                content_blocks.push(format!(
                    "Document {} ({}):\n{}",
                    index + 1,
                    files[index].name,
                    content
                ));
            }
            self.complete_stage();
        }

        self.add_stage("AI is structuring your case...");
        let response_schema = intake_response_schema();
        let llm_request = LlmRequest {
            prompt: intake_prompt(&description, &content_blocks),
            response_json_schema: Some(response_schema.clone()),
            add_context_from_internet: false,
        };
        let reply = match self.llm.invoke(&llm_request).await {
            Ok(reply) => resolve_structured_output(reply),
            Err(error) => {
                tracing::warn!(error = %error, "case structuring call failed");
                self.fail_stage(&error.to_string());
                return Ok(self.failed_outcome(
                    file_errors,
                    format!("Analysis failed: {error}. Please simplify your description or try again."),
                ));
            }
        };

        let violations = schema_violations(&reply, &response_schema);
        if !violations.is_empty() {
            tracing::warn!(?violations, "case reply does not match the requested schema");
        }

        if string_field(&reply, "title").is_none() || string_field(&reply, "case_type").is_none() {
            let message = "AI response is incomplete or invalid. Missing title or case_type.";
            self.fail_stage(message);
            return Ok(self.failed_outcome(
                file_errors,
                format!("Analysis failed: {message} Please simplify your description or try again."),
            ));
        }
        self.complete_stage();

        self.add_stage("Creating the legal case...");
        let draft = case_draft_from_reply(&reply, &description);
        let case = match self.cases.create(&draft) {
            Ok(case) => case,
            Err(error) => {
                tracing::error!(error = %error, "case creation failed");
                self.fail_stage(&error.to_string());
                return Ok(self.failed_outcome(
                    file_errors,
                    format!("Analysis failed: {error}. Please simplify your description or try again."),
                ));
            }
        };
        if case.id.trim().is_empty() {
            let message = "Database error: Case was not created successfully, returned invalid ID.";
            self.fail_stage(message);
            return Ok(self.failed_outcome(file_errors, message));
        }

        let documents = self.persist_documents(&case, &files, &uploaded, &contents);
        self.complete_stage();

        self.add_stage("Redirecting to your new case...");
        self.complete_stage();
        tokio::time::sleep(Duration::from_millis(self.settings.redirect_delay_ms)).await;

        Ok(IntakeOutcome {
            stages: self.stages,
            file_errors,
            warnings: self.warnings,
            result: IntakeResult::Completed { case, documents },
        })
    }

    /// All files upload concurrently; the first failure fails the batch.
    async fn upload_all(&self, files: &[IncomingFile]) -> Result<Vec<UploadedFile>, String> {
        let mut handles = Vec::with_capacity(files.len());
        for file in files.iter().cloned() {
            let storage = Arc::clone(&self.storage);
            handles.push(tokio::spawn(async move { storage.upload(&file).await }));
        }

        let mut uploaded = Vec::with_capacity(handles.len());
        let mut failure: Option<String> = None;
        for handle in handles {
            match handle.await {
                Ok(Ok(file)) => uploaded.push(file),
                Ok(Err(error)) => failure = Some(error.to_string()),
                Err(error) => failure = Some(error.to_string()),
            }
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(uploaded),
        }
    }

    /// Extractions run concurrently and fail independently: a failed file
    /// contributes a placeholder marker instead of aborting the run.
    async fn extract_all(&self, files: &[IncomingFile], uploaded: &[UploadedFile]) -> Vec<String> {
        let output_schema = json!({
            "type": "object",
            "properties": { "content": { "type": "string" } }
        });

        let mut handles = Vec::with_capacity(uploaded.len());
        for (index, uploaded_file) in uploaded.iter().enumerate() {
            let extractor = Arc::clone(&self.extractor);
            let file_url = uploaded_file.file_url.clone();
            let name = files[index].name.clone();
            let output_schema = output_schema.clone();
            handles.push(tokio::spawn(async move {
                match extractor.extract(&file_url, &output_schema).await {
                    Ok(result) => result.content().unwrap_or_default().to_string(),
                    Err(error) => {
                        tracing::warn!(file = %name, error = %error, "content extraction failed");
                        format!("[Content extraction failed for {name}]")
                    }
                }
            }));
        }

        let mut contents = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(content) => contents.push(content),
                Err(error) => {
                    tracing::warn!(file = %files[index].name, error = %error, "extraction task failed");
                    contents.push(format!(
                        "[Content extraction failed for {}]",
                        files[index].name
                    ));
                }
            }
        }
        contents
    }

    /// Best effort: a document that fails to persist is logged and surfaced
    /// as a warning; the case itself survives.
    fn persist_documents(
        &mut self,
        case: &LegalCase,
        files: &[IncomingFile],
        uploaded: &[UploadedFile],
        contents: &[String],
    ) -> Vec<CaseDocument> {
        let mut documents = Vec::with_capacity(uploaded.len());
        for (index, uploaded_file) in uploaded.iter().enumerate() {
            let draft = DocumentDraft {
                case_id: case.id.clone(),
                title: file_stem(&files[index].name).to_string(),
                file_url: uploaded_file.file_url.clone(),
                file_type: file_extension(&files[index].name).unwrap_or_default(),
                extracted_content: contents[index].clone(),
                document_category: DocumentCategory::Other,
            };
            match self.documents.create(&draft) {
                Ok(document) => documents.push(document),
                Err(error) => {
                    tracing::warn!(file = %files[index].name, error = %error, "failed to save document");
                    self.warnings
                        .push(format!("Failed to save document {}: {error}", files[index].name));
                }
            }
        }
        documents
    }

    fn add_stage(&mut self, title: &str) {
        self.stages.push(StageState {
            title: title.to_string(),
            status: StageStatus::Processing,
            error: None,
        });
        self.emit();
    }

    fn complete_stage(&mut self) {
        if let Some(stage) = self.stages.last_mut() {
            stage.status = StageStatus::Complete;
        }
        self.emit();
    }

    fn fail_stage(&mut self, message: &str) {
        if let Some(stage) = self.stages.last_mut() {
            stage.status = StageStatus::Error;
            stage.error = Some(message.to_string());
        }
        self.emit();
    }

    fn emit(&self) {
        if let Some(progress) = &self.progress {
            let _ = progress.send(IntakeProgress {
                stages: self.stages.clone(),
            });
        }
    }

    fn failed_outcome(self, file_errors: Vec<String>, message: impl Into<String>) -> IntakeOutcome {
        let stage = self
            .stages
            .last()
            .map(|stage| stage.title.clone())
            .unwrap_or_default();
        IntakeOutcome {
            stages: self.stages,
            file_errors,
            warnings: self.warnings,
            result: IntakeResult::Failed {
                stage,
                message: message.into(),
            },
        }
    }
}

/// The structuring stage may populate every case property except `status`,
/// which the workflow fixes to `active`.
pub(crate) fn intake_response_schema() -> Value {
    let mut properties = case_schema()["properties"].clone();
    if let Some(map) = properties.as_object_mut() {
        map.remove("status");
    }
    json!({ "type": "object", "properties": properties })
}

/// Maps the structuring reply onto a draft, with fallbacks for anything
/// the model left out or mangled. `status` is always `active`.
fn case_draft_from_reply(reply: &Value, fallback_description: &str) -> CaseDraft {
    let case_type = reply
        .get("case_type")
        .and_then(|value| serde_json::from_value::<CaseType>(value.clone()).ok())
        .unwrap_or(CaseType::Other);
    let priority = reply
        .get("priority")
        .and_then(|value| serde_json::from_value::<CasePriority>(value.clone()).ok())
        .unwrap_or_default();

    CaseDraft {
        title: string_field(reply, "title")
            .unwrap_or(UNTITLED_CASE)
            .to_string(),
        case_type,
        description: Some(
            string_field(reply, "description")
                .unwrap_or(fallback_description)
                .to_string(),
        ),
        jurisdiction: string_field(reply, "jurisdiction").map(ToString::to_string),
        status: CaseStatus::Active,
        priority,
        deadline: string_field(reply, "deadline").map(ToString::to_string),
    }
}
