//! Event handling for the header extraction function
//!
//! A storage notification batch ([`S3Event`]) is walked record by record;
//! each record is classified as an [`EventKind`] and routed to a
//! [`RecordHandler`] hook.
//!
//! ## Key Components
//!
//! - [`RecordHandler`] - Per-kind hooks, the seam for fakes in tests
//! - [`FitsHeaderHandler`] - Extracts FITS headers to CSV, deletes on removal
//! - [`dispatch_batch`] - Routes records in delivery order
//! - [`output_key`] - `<bucket>/<key>/data.csv` naming of outputs
//!
//! ## Example
//!
//! ```rust,ignore
//! use fitslake::handlers::{FitsHeaderHandler, S3Event};
//! use fitslake::storage::StorageClient;
//!
//! let handler = FitsHeaderHandler::from_config(&config, StorageClient::in_memory())?;
//! let outcome = handler.handle(event).await?;
//! for record in &outcome.records {
//!     println!("{}", record.summary());
//! }
//! ```

pub mod csv;
mod dispatch;
mod fits;
mod traits;
mod types;

pub use csv::{CsvDocument, HEADER_LINE, LINE_SEPARATOR, OutputRow, output_key};
pub use dispatch::dispatch_batch;
pub use fits::{Extraction, FitsHeaderHandler, SKIPPED_KEYWORDS, extract_headers};
pub use traits::{HandlerError, RecordHandler};
pub use types::{
    BatchOutcome, BucketEntity, CREATED_PREFIX, EventKind, EventRecord, IGNORED_MESSAGE,
    ObjectEntity, ObjectRef, REMOVED_PREFIX, RecordOutcome, S3Entity, S3Event, decode_key,
};
