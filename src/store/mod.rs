mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::errors::{AppError, AppResult};
use crate::models::AppSettings;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use uuid::Uuid;

const SETTINGS_KEY: &str = "settings:app";

/// Synchronous named-blob storage. Implementations must make each `set`
/// atomic: a partially written blob must never become visible.
pub trait StoreBackend: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
}

/// Collection-of-records view over a [`StoreBackend`]. Every operation is
/// read-modify-write of the whole collection, single writer assumed: two
/// clients writing the same collection concurrently will lose one of the
/// writes. That limitation is inherent to the blob contract and is not
/// papered over here.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn StoreBackend>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub fn list(&self, collection: &str, order: Option<&str>) -> AppResult<Vec<Value>> {
        let mut records = self.read_collection(collection)?;
        apply_order(&mut records, order);
        Ok(records)
    }

    /// Exact-match filter: every key in `predicate` must equal the record's
    /// field. No partial or range matching.
    pub fn filter(
        &self,
        collection: &str,
        predicate: &Value,
        order: Option<&str>,
    ) -> AppResult<Vec<Value>> {
        let conditions = predicate
            .as_object()
            .ok_or_else(|| AppError::Validation("filter predicate must be an object".to_string()))?;

        let mut records: Vec<Value> = self
            .read_collection(collection)?
            .into_iter()
            .filter(|record| {
                conditions
                    .iter()
                    .all(|(field, expected)| record.get(field) == Some(expected))
            })
            .collect();
        apply_order(&mut records, order);
        Ok(records)
    }

    pub fn get(&self, collection: &str, id: &str) -> AppResult<Option<Value>> {
        let records = self.read_collection(collection)?;
        Ok(records.into_iter().find(|record| record_id(record) == Some(id)))
    }

    /// Assigns a fresh id and creation timestamp; both are store-owned and
    /// cannot be supplied by the caller.
    pub fn create(&self, collection: &str, data: Value) -> AppResult<Value> {
        let data = data
            .as_object()
            .cloned()
            .ok_or_else(|| AppError::Validation("record data must be an object".to_string()))?;

        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        record.insert(
            "created_date".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        for (field, value) in data {
            if field == "id" || field == "created_date" {
                continue;
            }
            record.insert(field, value);
        }

        let record = Value::Object(record);
        let mut records = self.read_collection(collection)?;
        records.push(record.clone());
        self.write_collection(collection, &records)?;
        Ok(record)
    }

    /// Shallow merge of `patch` over the stored record. `id` and
    /// `created_date` are immutable.
    pub fn update(&self, collection: &str, id: &str, patch: Value) -> AppResult<Value> {
        let patch = patch
            .as_object()
            .cloned()
            .ok_or_else(|| AppError::Validation("update patch must be an object".to_string()))?;

        let mut records = self.read_collection(collection)?;
        let index = records
            .iter()
            .position(|record| record_id(record) == Some(id))
            .ok_or_else(|| AppError::NotFound(format!("No {collection} record with id {id}")))?;

        let existing = records[index]
            .as_object_mut()
            .ok_or_else(|| AppError::Internal(format!("malformed record in {collection}")))?;
        for (field, value) in patch {
            if field == "id" || field == "created_date" {
                continue;
            }
            existing.insert(field, value);
        }

        let updated = records[index].clone();
        self.write_collection(collection, &records)?;
        Ok(updated)
    }

    /// Idempotent: deleting an absent id is not an error.
    pub fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let mut records = self.read_collection(collection)?;
        let before = records.len();
        records.retain(|record| record_id(record) != Some(id));
        if records.len() != before {
            self.write_collection(collection, &records)?;
        }
        Ok(())
    }

    pub fn settings(&self) -> AppResult<AppSettings> {
        match self.backend.get(SETTINGS_KEY)? {
            Some(raw) => Ok(serde_json::from_str::<AppSettings>(&raw).unwrap_or_default()),
            None => Ok(AppSettings::default()),
        }
    }

    pub fn update_settings(&self, update: Value) -> AppResult<AppSettings> {
        let current = self.settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: AppSettings = serde_json::from_value(merged)?;
        self.backend
            .set(SETTINGS_KEY, &serde_json::to_string(&settings)?)?;
        Ok(settings)
    }

    fn read_collection(&self, collection: &str) -> AppResult<Vec<Value>> {
        let Some(raw) = self.backend.get(collection)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(records) => Ok(records),
            Err(error) => {
                tracing::warn!(collection, error = %error, "discarding unreadable collection blob");
                Ok(Vec::new())
            }
        }
    }

    fn write_collection(&self, collection: &str, records: &[Value]) -> AppResult<()> {
        self.backend.set(collection, &serde_json::to_string(records)?)
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(|id| id.as_str())
}

/// `order` is a field name, `-` prefixed for descending. Records without a
/// comparable value for the field sort after those that have one, in either
/// direction. The sort is stable.
fn apply_order(records: &mut [Value], order: Option<&str>) {
    let Some(order) = order else {
        return;
    };
    let (field, descending) = match order.strip_prefix('-') {
        Some(field) => (field, true),
        None => (order, false),
    };

    records.sort_by(|a, b| {
        let left = a.get(field).filter(|value| !value.is_null());
        let right = b.get(field).filter(|value| !value.is_null());
        match (left, right) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => {
                let ordering = compare_values(left, right);
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            }
        }
    });
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        _ => Ordering::Equal,
    }
}

fn merge_json(target: &mut Value, update: Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryBackend, RecordStore, StoreBackend};
    use crate::errors::AppError;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> RecordStore {
        RecordStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn create_assigns_id_and_timestamp_and_get_finds_it() {
        let store = store();
        let created = store
            .create("legal_cases", json!({ "title": "Lease dispute" }))
            .expect("create");

        let id = created["id"].as_str().expect("id").to_string();
        assert!(!id.is_empty());
        assert!(created["created_date"].is_string());

        let fetched = store.get("legal_cases", &id).expect("get").expect("found");
        assert_eq!(fetched, created);
    }

    #[test]
    fn create_ids_are_unique_and_store_assigned() {
        let store = store();
        let first = store
            .create("legal_cases", json!({ "id": "forced", "title": "a" }))
            .expect("create");
        let second = store
            .create("legal_cases", json!({ "title": "b" }))
            .expect("create");

        assert_ne!(first["id"], json!("forced"));
        assert_ne!(first["id"], second["id"]);
    }

    #[test]
    fn update_merges_shallowly_and_guards_immutable_fields() {
        let store = store();
        let created = store
            .create(
                "legal_cases",
                json!({ "title": "Original", "priority": "medium" }),
            )
            .expect("create");
        let id = created["id"].as_str().expect("id");

        let updated = store
            .update(
                "legal_cases",
                id,
                json!({ "priority": "urgent", "id": "hijack", "created_date": "1999-01-01" }),
            )
            .expect("update");

        assert_eq!(updated["title"], json!("Original"));
        assert_eq!(updated["priority"], json!("urgent"));
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["created_date"], created["created_date"]);
    }

    #[test]
    fn update_of_missing_id_is_not_found() {
        let store = store();
        let error = store
            .update("legal_cases", "missing", json!({ "title": "x" }))
            .expect_err("should fail");
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = store();
        let created = store
            .create("documents", json!({ "title": "exhibit" }))
            .expect("create");
        let id = created["id"].as_str().expect("id");

        store.delete("documents", id).expect("first delete");
        store.delete("documents", id).expect("second delete");
        assert!(store.get("documents", id).expect("get").is_none());
    }

    #[test]
    fn list_orders_descending_with_missing_values_last() {
        let store = store();
        store
            .create("chat_messages", json!({ "seq": 1 }))
            .expect("create");
        store
            .create("chat_messages", json!({ "seq": 3 }))
            .expect("create");
        store
            .create("chat_messages", json!({ "other": true }))
            .expect("create");
        store
            .create("chat_messages", json!({ "seq": 2 }))
            .expect("create");

        let records = store.list("chat_messages", Some("-seq")).expect("list");
        let seqs: Vec<Option<i64>> = records
            .iter()
            .map(|record| record.get("seq").and_then(|seq| seq.as_i64()))
            .collect();
        assert_eq!(seqs, vec![Some(3), Some(2), Some(1), None]);

        let ascending = store.list("chat_messages", Some("seq")).expect("list");
        let seqs: Vec<Option<i64>> = ascending
            .iter()
            .map(|record| record.get("seq").and_then(|seq| seq.as_i64()))
            .collect();
        assert_eq!(seqs, vec![Some(1), Some(2), Some(3), None]);
    }

    #[test]
    fn list_by_created_date_descending_is_non_increasing() {
        let store = store();
        for title in ["a", "b", "c"] {
            store
                .create("legal_cases", json!({ "title": title }))
                .expect("create");
        }

        let records = store
            .list("legal_cases", Some("-created_date"))
            .expect("list");
        let stamps: Vec<&str> = records
            .iter()
            .map(|record| record["created_date"].as_str().expect("created_date"))
            .collect();
        for pair in stamps.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn filter_matches_exactly() {
        let store = store();
        store
            .create("documents", json!({ "case_id": "c1", "title": "first" }))
            .expect("create");
        store
            .create("documents", json!({ "case_id": "c2", "title": "second" }))
            .expect("create");
        store
            .create("documents", json!({ "case_id": "c1", "title": "third" }))
            .expect("create");

        let matches = store
            .filter("documents", &json!({ "case_id": "c1" }), None)
            .expect("filter");
        assert_eq!(matches.len(), 2);
        assert!(matches
            .iter()
            .all(|record| record["case_id"] == json!("c1")));

        let none = store
            .filter("documents", &json!({ "case_id": "c1", "title": "second" }), None)
            .expect("filter");
        assert!(none.is_empty());
    }

    #[test]
    fn unreadable_collection_blob_reads_as_empty() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set("legal_cases", "not json")
            .expect("seed corrupt blob");
        let store = RecordStore::new(backend);
        assert!(store.list("legal_cases", None).expect("list").is_empty());
    }

    #[test]
    fn settings_round_trip_and_merge() {
        let store = store();
        let defaults = store.settings().expect("defaults");
        assert_eq!(defaults.max_upload_mb, 10);

        let updated = store
            .update_settings(json!({ "max_upload_mb": 25 }))
            .expect("update settings");
        assert_eq!(updated.max_upload_mb, 25);
        assert_eq!(updated.redirect_delay_ms, defaults.redirect_delay_ms);

        let reloaded = store.settings().expect("reload");
        assert_eq!(reloaded.max_upload_mb, 25);
    }
}
