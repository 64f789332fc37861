pub mod adapters;
pub mod chat;
pub mod errors;
pub mod generator;
pub mod harness;
pub mod intake;
pub mod models;
pub mod repo;
pub mod store;
pub mod workbench;

pub use crate::chat::ASSISTANT_APOLOGY;
pub use crate::errors::{AppError, AppResult};
pub use crate::intake::{IntakeOutcome, IntakeProgress, IntakeResult, StageState, StageStatus};
pub use crate::workbench::Workbench;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

pub fn init_tracing(data_dir: &Path) -> Result<(), String> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "workbench.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}
