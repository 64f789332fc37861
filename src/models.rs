use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    PersonalInjury,
    ContractDispute,
    FamilyLaw,
    CriminalDefense,
    Employment,
    RealEstate,
    Corporate,
    IntellectualProperty,
    Immigration,
    Other,
}

impl CaseType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PersonalInjury => "personal_injury",
            Self::ContractDispute => "contract_dispute",
            Self::FamilyLaw => "family_law",
            Self::CriminalDefense => "criminal_defense",
            Self::Employment => "employment",
            Self::RealEstate => "real_estate",
            Self::Corporate => "corporate",
            Self::IntellectualProperty => "intellectual_property",
            Self::Immigration => "immigration",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    #[default]
    Active,
    Research,
    Drafting,
    Filing,
    Completed,
    Closed,
}

impl CaseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Research => "research",
            Self::Drafting => "drafting",
            Self::Filing => "filing",
            Self::Completed => "completed",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CasePriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl CasePriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Contract,
    Correspondence,
    Evidence,
    CourtFiling,
    Research,
    Form,
    #[default]
    Other,
}

impl DocumentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contract => "contract",
            Self::Correspondence => "correspondence",
            Self::Evidence => "evidence",
            Self::CourtFiling => "court_filing",
            Self::Research => "research",
            Self::Form => "form",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    User,
    Assistant,
}

impl MessageSender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegalCase {
    pub id: String,
    pub created_date: DateTime<Utc>,
    pub title: String,
    pub case_type: CaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub priority: CasePriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDocument {
    pub id: String,
    pub created_date: DateTime<Utc>,
    pub case_id: String,
    pub title: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub extracted_content: String,
    #[serde(default)]
    pub document_category: DocumentCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub created_date: DateTime<Utc>,
    pub case_id: String,
    pub message: String,
    pub sender: MessageSender,
    #[serde(default = "default_message_type")]
    pub message_type: String,
}

fn default_message_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDraft {
    pub title: String,
    pub case_type: CaseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub priority: CasePriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentDraft {
    pub case_id: String,
    pub title: String,
    pub file_url: String,
    pub file_type: String,
    pub extracted_content: String,
    pub document_category: DocumentCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDraft {
    pub case_id: String,
    pub message: String,
    pub sender: MessageSender,
    pub message_type: String,
}

impl MessageDraft {
    pub fn text(case_id: &str, message: impl Into<String>, sender: MessageSender) -> Self {
        Self {
            case_id: case_id.to_string(),
            message: message.into(),
            sender,
            message_type: "text".to_string(),
        }
    }
}

/// A file handed over by the UI layer, content carried as a base64 data URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub data_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub status: ExtractionStatus,
    #[serde(default)]
    pub output: Option<Value>,
}

impl ExtractionResult {
    pub fn content(&self) -> Option<&str> {
        if self.status != ExtractionStatus::Success {
            return None;
        }
        self.output
            .as_ref()
            .and_then(|output| output.get("content"))
            .and_then(|content| content.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: String,
    pub response_json_schema: Option<Value>,
    pub add_context_from_internet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCaseRequest {
    pub description: String,
    #[serde(default)]
    pub files: Vec<IncomingFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachDocumentPayload {
    pub case_id: String,
    pub file: IncomingFile,
    pub title: String,
    pub document_category: DocumentCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    DemandLetter,
    Contract,
    Motion,
    Affidavit,
    CeaseDesist,
    SettlementAgreement,
    PrivacyPolicy,
    TermsOfService,
    EmploymentContract,
    Nda,
}

impl DocumentType {
    pub fn label(self) -> &'static str {
        match self {
            Self::DemandLetter => "Demand Letter",
            Self::Contract => "Contract",
            Self::Motion => "Motion",
            Self::Affidavit => "Affidavit",
            Self::CeaseDesist => "Cease and Desist",
            Self::SettlementAgreement => "Settlement Agreement",
            Self::PrivacyPolicy => "Privacy Policy",
            Self::TermsOfService => "Terms of Service",
            Self::EmploymentContract => "Employment Contract",
            Self::Nda => "Non-Disclosure Agreement",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::DemandLetter => "Formal request for payment or action",
            Self::Contract => "Legal agreement between parties",
            Self::Motion => "Court filing requesting specific action",
            Self::Affidavit => "Sworn statement of facts",
            Self::CeaseDesist => "Letter demanding cessation of activity",
            Self::SettlementAgreement => "Agreement to resolve dispute",
            Self::PrivacyPolicy => "Website/app privacy policy",
            Self::TermsOfService => "User agreement for services",
            Self::EmploymentContract => "Agreement between employer and employee",
            Self::Nda => "Confidentiality agreement",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDocumentRequest {
    pub document_type: DocumentType,
    #[serde(default)]
    pub parties: Option<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    pub details: String,
    #[serde(default)]
    pub special_requirements: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    pub document_type: DocumentType,
    pub content: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseWorkspace {
    pub case: LegalCase,
    pub documents: Vec<CaseDocument>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseOverview {
    pub total_cases: usize,
    pub active_cases: usize,
    pub documents: usize,
    pub messages: usize,
    pub urgent_deadlines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user_message: ChatMessage,
    pub assistant_message: ChatMessage,
    pub case: LegalCase,
    #[serde(default)]
    pub applied_updates: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub max_upload_mb: u32,
    pub allowed_file_types: Vec<String>,
    pub redirect_delay_ms: u64,
    pub add_context_from_internet: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_upload_mb: 10,
            allowed_file_types: ["pdf", "png", "jpg", "jpeg", "docx", "txt"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            redirect_delay_ms: 800,
            add_context_from_internet: true,
        }
    }
}

impl AppSettings {
    pub fn max_upload_bytes(&self) -> u64 {
        u64::from(self.max_upload_mb) * 1024 * 1024
    }
}

static CASE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::json!({
        "name": "LegalCase",
        "type": "object",
        "properties": {
            "title": { "type": "string", "description": "Name or title of the legal case" },
            "description": { "type": "string", "description": "Detailed description of the case" },
            "case_type": {
                "type": "string",
                "enum": [
                    "personal_injury", "contract_dispute", "family_law", "criminal_defense",
                    "employment", "real_estate", "corporate", "intellectual_property",
                    "immigration", "other"
                ],
                "description": "Type of legal case"
            },
            "jurisdiction": { "type": "string", "description": "State or jurisdiction for the case" },
            "status": {
                "type": "string",
                "enum": ["active", "research", "drafting", "filing", "completed", "closed"],
                "default": "active",
                "description": "Current status of the case"
            },
            "priority": {
                "type": "string",
                "enum": ["low", "medium", "high", "urgent"],
                "default": "medium",
                "description": "Priority level of the case"
            },
            "deadline": { "type": "string", "format": "date", "description": "Important deadline for the case" }
        },
        "required": ["title", "case_type"]
    })
});

/// Schema descriptor for the case entity. The AI structuring stage is
/// constrained to these properties.
pub fn case_schema() -> &'static Value {
    &CASE_SCHEMA
}
