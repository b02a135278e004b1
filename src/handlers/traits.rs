use async_trait::async_trait;
use thiserror::Error;

use super::types::{EventRecord, ObjectRef, RecordOutcome};
use crate::fits::FitsError;
use crate::storage::StorageError;

/// Failures that abort an invocation
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid event record: {0}")]
    InvalidRecord(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to parse FITS object {key}: {source}")]
    Fits {
        key: String,
        #[source]
        source: FitsError,
    },

    #[error("scratch area unavailable: {0}")]
    Scratch(#[source] std::io::Error),
}

/// Per-record hooks invoked by [`super::dispatch_batch`]
///
/// Implementations own the side effects for each kind of record. Records
/// of unknown kinds get an informational outcome unless overridden.
#[async_trait]
pub trait RecordHandler: Send + Sync {
    /// A source object was created or overwritten
    async fn on_created(&self, object: ObjectRef) -> Result<RecordOutcome, HandlerError>;

    /// A source object was removed
    async fn on_removed(&self, object: ObjectRef) -> Result<RecordOutcome, HandlerError>;

    /// Anything else; must not mutate storage
    async fn on_unrecognized(&self, record: &EventRecord) -> Result<RecordOutcome, HandlerError> {
        Ok(RecordOutcome::ignored(record.event_name.clone()))
    }
}
