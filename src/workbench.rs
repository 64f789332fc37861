use crate::adapters::{ContentExtractor, FileStorage, LlmClient, LocalFileStorage};
use crate::chat::run_chat_turn;
use crate::errors::{AppError, AppResult};
use crate::generator::run_generator;
use crate::harness::attachments::{file_extension, validate_attachment};
use crate::intake::{IntakeOutcome, IntakeRunner, ProgressSender};
use crate::models::{
    AppSettings, AttachDocumentPayload, CaseDocument, CaseOverview, CaseStatus, CaseWorkspace,
    ChatTurn, CreateCaseRequest, DocumentDraft, GenerateDocumentRequest, GeneratedDocument,
    LegalCase,
};
use crate::repo::{CaseRepo, DocumentRepo, MessageRepo};
use crate::store::{RecordStore, SqliteBackend, StoreBackend};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// The core behind the UI: owns the record store, the typed repositories,
/// and the external collaborators, and exposes one method per user-facing
/// operation.
#[derive(Clone)]
pub struct Workbench {
    store: RecordStore,
    cases: CaseRepo,
    documents: DocumentRepo,
    messages: MessageRepo,
    storage: Arc<dyn FileStorage>,
    extractor: Arc<dyn ContentExtractor>,
    llm: Arc<dyn LlmClient>,
}

impl Workbench {
    pub fn new(
        backend: Arc<dyn StoreBackend>,
        storage: Arc<dyn FileStorage>,
        extractor: Arc<dyn ContentExtractor>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let store = RecordStore::new(backend);
        Self {
            cases: CaseRepo::new(store.clone()),
            documents: DocumentRepo::new(store.clone()),
            messages: MessageRepo::new(store.clone()),
            store,
            storage,
            extractor,
            llm,
        }
    }

    /// Convenience constructor for the usual local deployment: SQLite state
    /// and uploads both live under `data_dir`.
    pub fn open(
        data_dir: &Path,
        extractor: Arc<dyn ContentExtractor>,
        llm: Arc<dyn LlmClient>,
    ) -> AppResult<Self> {
        let backend = Arc::new(SqliteBackend::new(&data_dir.join("state.sqlite"))?);
        let storage = Arc::new(LocalFileStorage::new(data_dir));
        Ok(Self::new(backend, storage, extractor, llm))
    }

    pub fn settings(&self) -> AppResult<AppSettings> {
        self.store.settings()
    }

    pub fn update_settings(&self, patch: Value) -> AppResult<AppSettings> {
        self.store.update_settings(patch)
    }

    pub fn list_cases(&self, order: Option<&str>) -> AppResult<Vec<LegalCase>> {
        self.cases.list(order)
    }

    pub fn get_case(&self, case_id: &str) -> AppResult<Option<LegalCase>> {
        self.cases.get(case_id)
    }

    pub fn update_case(&self, case_id: &str, patch: Value) -> AppResult<LegalCase> {
        self.cases.update(case_id, patch)
    }

    pub fn case_overview(&self) -> AppResult<CaseOverview> {
        let cases = self.cases.list(None)?;
        let documents = self.documents.list(None)?;
        let messages = self.messages.list(None)?;

        let week_from_now = Utc::now().date_naive() + Duration::days(7);
        let urgent_deadlines = cases
            .iter()
            .filter(|case| {
                case.deadline
                    .as_deref()
                    .and_then(|deadline| NaiveDate::parse_from_str(deadline, "%Y-%m-%d").ok())
                    .map(|deadline| deadline <= week_from_now)
                    .unwrap_or(false)
            })
            .count();

        Ok(CaseOverview {
            total_cases: cases.len(),
            active_cases: cases
                .iter()
                .filter(|case| case.status == CaseStatus::Active)
                .count(),
            documents: documents.len(),
            messages: messages.len(),
            urgent_deadlines,
        })
    }

    /// Cascade is the caller's responsibility at the store level, so it is
    /// implemented here: documents first, then messages, then the case.
    pub fn delete_case(&self, case_id: &str) -> AppResult<()> {
        let documents = self
            .documents
            .filter(json!({ "case_id": case_id }), None)?;
        for document in documents {
            self.documents.delete(&document.id)?;
        }
        let messages = self.messages.filter(json!({ "case_id": case_id }), None)?;
        for message in messages {
            self.messages.delete(&message.id)?;
        }
        self.cases.delete(case_id)
    }

    /// Everything the chat view needs: the case, its documents newest
    /// first, its transcript oldest first.
    pub fn load_case_workspace(&self, case_id: &str) -> AppResult<CaseWorkspace> {
        let case = self
            .cases
            .get(case_id)?
            .ok_or_else(|| AppError::NotFound("Case not found.".to_string()))?;
        let documents = self
            .documents
            .filter(json!({ "case_id": case_id }), Some("-created_date"))?;
        let messages = self
            .messages
            .filter(json!({ "case_id": case_id }), Some("created_date"))?;
        Ok(CaseWorkspace {
            case,
            documents,
            messages,
        })
    }

    /// Single-file upload into an existing case. Unlike intake, an
    /// extraction failure fails the whole operation; missing content
    /// degrades to an empty string.
    pub async fn attach_document(
        &self,
        payload: AttachDocumentPayload,
    ) -> AppResult<CaseDocument> {
        if payload.title.trim().is_empty() {
            return Err(AppError::Validation(
                "Please select a file, title, and category.".to_string(),
            ));
        }
        let settings = self.settings()?;
        let errors = validate_attachment(&payload.file, &settings);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join(" ")));
        }
        if self.cases.get(&payload.case_id)?.is_none() {
            return Err(AppError::NotFound(format!(
                "No case with id {}",
                payload.case_id
            )));
        }

        let uploaded = self.storage.upload(&payload.file).await.map_err(AppError::from)?;
        let output_schema = json!({
            "type": "object",
            "properties": { "content": { "type": "string" } }
        });
        let extracted = self
            .extractor
            .extract(&uploaded.file_url, &output_schema)
            .await
            .map_err(AppError::from)?;

        self.documents.create(&DocumentDraft {
            case_id: payload.case_id.clone(),
            title: payload.title.clone(),
            file_url: uploaded.file_url,
            file_type: file_extension(&payload.file.name).unwrap_or_default(),
            extracted_content: extracted.content().unwrap_or_default().to_string(),
            document_category: payload.document_category,
        })
    }

    /// The staged intake pipeline; see [`crate::intake`].
    pub async fn create_case_with_ai(
        &self,
        request: CreateCaseRequest,
        progress: Option<ProgressSender>,
    ) -> AppResult<IntakeOutcome> {
        let runner = IntakeRunner::new(
            self.cases.clone(),
            self.documents.clone(),
            Arc::clone(&self.storage),
            Arc::clone(&self.extractor),
            Arc::clone(&self.llm),
            self.settings()?,
            progress,
        );
        runner.run(request).await
    }

    pub async fn send_message(&self, case_id: &str, user_text: &str) -> AppResult<ChatTurn> {
        let settings = self.settings()?;
        run_chat_turn(
            &self.cases,
            &self.documents,
            &self.messages,
            &self.llm,
            &settings,
            case_id,
            user_text,
        )
        .await
    }

    pub async fn generate_document(
        &self,
        request: &GenerateDocumentRequest,
    ) -> AppResult<GeneratedDocument> {
        run_generator(&self.llm, request).await
    }
}
