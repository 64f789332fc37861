use crate::errors::{AppError, AppResult};
use crate::models::{
    CaseDocument, CaseDraft, ChatMessage, DocumentDraft, LegalCase, MessageDraft,
};
use crate::store::RecordStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;

/// Binds an entity type to its collection name and creation payload.
/// Draft validation runs at the repository boundary, before anything is
/// handed to the store.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync {
    const COLLECTION: &'static str;
    type Draft: Serialize + Send + Sync;

    fn validate_draft(draft: &Self::Draft) -> AppResult<()>;
}

impl Entity for LegalCase {
    const COLLECTION: &'static str = "legal_cases";
    type Draft = CaseDraft;

    fn validate_draft(draft: &CaseDraft) -> AppResult<()> {
        if draft.title.trim().is_empty() {
            return Err(AppError::Validation(
                "Case title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Entity for CaseDocument {
    const COLLECTION: &'static str = "documents";
    type Draft = DocumentDraft;

    fn validate_draft(draft: &DocumentDraft) -> AppResult<()> {
        if draft.case_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Document must reference a case".to_string(),
            ));
        }
        Ok(())
    }
}

impl Entity for ChatMessage {
    const COLLECTION: &'static str = "chat_messages";
    type Draft = MessageDraft;

    fn validate_draft(draft: &MessageDraft) -> AppResult<()> {
        if draft.case_id.trim().is_empty() {
            return Err(AppError::Validation(
                "Message must reference a case".to_string(),
            ));
        }
        Ok(())
    }
}

/// One repository implementation for every entity, parameterized by the
/// bound collection. No per-entity subclasses.
#[derive(Clone)]
pub struct EntityRepo<T: Entity> {
    store: RecordStore,
    _entity: PhantomData<T>,
}

pub type CaseRepo = EntityRepo<LegalCase>;
pub type DocumentRepo = EntityRepo<CaseDocument>;
pub type MessageRepo = EntityRepo<ChatMessage>;

impl<T: Entity> EntityRepo<T> {
    pub fn new(store: RecordStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub fn list(&self, order: Option<&str>) -> AppResult<Vec<T>> {
        let records = self.store.list(T::COLLECTION, order)?;
        records
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(AppError::from))
            .collect()
    }

    pub fn filter(&self, predicate: Value, order: Option<&str>) -> AppResult<Vec<T>> {
        let records = self.store.filter(T::COLLECTION, &predicate, order)?;
        records
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(AppError::from))
            .collect()
    }

    pub fn get(&self, id: &str) -> AppResult<Option<T>> {
        match self.store.get(T::COLLECTION, id)? {
            Some(record) => Ok(Some(serde_json::from_value(record)?)),
            None => Ok(None),
        }
    }

    pub fn create(&self, draft: &T::Draft) -> AppResult<T> {
        T::validate_draft(draft)?;
        let record = self.store.create(T::COLLECTION, serde_json::to_value(draft)?)?;
        Ok(serde_json::from_value(record)?)
    }

    pub fn update(&self, id: &str, patch: Value) -> AppResult<T> {
        let record = self.store.update(T::COLLECTION, id, patch)?;
        Ok(serde_json::from_value(record)?)
    }

    pub fn delete(&self, id: &str) -> AppResult<()> {
        self.store.delete(T::COLLECTION, id)
    }
}
