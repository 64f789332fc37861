pub mod local;

pub use local::LocalFileStorage;

use crate::models::{ExtractionResult, IncomingFile, LlmRequest, UploadedFile};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Stores a raw file and returns a stable reference to it. Any failure is
/// fatal to the stage that requested the upload.
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn upload(&self, file: &IncomingFile) -> Result<UploadedFile>;
}

/// Pulls text out of a previously uploaded file. `output_schema` describes
/// the requested shape of the `output` object. Failures are recoverable
/// per file.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, file_url: &str, output_schema: &Value) -> Result<ExtractionResult>;
}

/// Invokes the language model. Returns a JSON object when the request
/// carried a response schema, a JSON string otherwise. Conformance is
/// best-effort; callers decide which missing fields are fatal.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, request: &LlmRequest) -> Result<Value>;
}
