use std::io::{Read, Seek};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::csv::{CsvDocument, OutputRow, output_key};
use super::dispatch::dispatch_batch;
use super::traits::{HandlerError, RecordHandler};
use super::types::{BatchOutcome, EventRecord, ObjectRef, RecordOutcome, S3Event};
use crate::config::{Config, ExtractorConfig, ValidationError};
use crate::fits::{FitsError, HduReader};
use crate::observability::Metrics;
use crate::storage::{Scratch, StorageClient};

/// Keywords never written as rows: the blank keyword and the multi-line
/// HISTORY aggregate
pub const SKIPPED_KEYWORDS: [&str; 2] = ["", "HISTORY"];

/// CSV payload for one source object
#[derive(Debug, Clone)]
pub struct Extraction {
    pub csv: String,
    pub hdus: usize,
    pub rows: usize,
    /// Malformed cards left out
    pub skipped_cards: usize,
}

/// Render every header card of a FITS stream as CSV rows.
///
/// Malformed cards are logged and skipped; structural errors abort.
pub fn extract_headers<R: Read + Seek>(
    reader: R,
    bucket: &str,
    key: &str,
) -> Result<Extraction, FitsError> {
    let mut doc = CsvDocument::new();
    let mut hdus = 0;
    let mut skipped_cards = 0;

    for header in HduReader::new(reader) {
        let header = header?;
        hdus += 1;

        for (position, entry) in header.entries().iter().enumerate() {
            let card = match entry {
                Ok(card) => card,
                Err(e) => {
                    warn!(
                        bucket,
                        key,
                        hdu = header.index(),
                        card = position,
                        error = %e,
                        "Verify error, ignoring card"
                    );
                    skipped_cards += 1;
                    continue;
                }
            };

            if SKIPPED_KEYWORDS.contains(&card.keyword.as_str()) {
                continue;
            }

            doc.push(&OutputRow {
                hdu: header.index(),
                source_bucket: bucket,
                source_key: key,
                card_name: &card.keyword,
                card_value: card.value.to_string(),
                card_comment: &card.comment,
            });
        }
    }

    Ok(Extraction {
        rows: doc.rows(),
        csv: doc.into_string(),
        hdus,
        skipped_cards,
    })
}

/// Writes one CSV per created FITS object and removes it with the source
pub struct FitsHeaderHandler {
    storage: StorageClient,
    destination: String,
    settings: ExtractorConfig,
    metrics: Arc<Metrics>,
}

impl FitsHeaderHandler {
    pub fn new(storage: StorageClient, destination: impl Into<String>, settings: ExtractorConfig) -> Self {
        Self {
            storage,
            destination: destination.into(),
            settings,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Build from validated configuration; fails without a destination bucket
    pub fn from_config(config: &Config, storage: StorageClient) -> Result<Self, ValidationError> {
        let destination = config.destination_bucket()?;
        Ok(Self::new(storage, destination, config.extractor.clone()))
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Process one notification batch
    pub async fn handle(&self, event: S3Event) -> Result<BatchOutcome, HandlerError> {
        let outcome = dispatch_batch(self, event).await?;
        info!(
            records = outcome.records.len(),
            message = %outcome.message,
            "Batch processed"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl RecordHandler for FitsHeaderHandler {
    async fn on_created(&self, object: ObjectRef) -> Result<RecordOutcome, HandlerError> {
        let limit = self.settings.max_object_bytes.as_u64();

        // Dropped at the end of this block, also when parsing fails
        let (extraction, source_bytes) = {
            let scratch =
                Scratch::acquire(self.settings.scratch, self.settings.scratch_dir.as_deref())
                    .map_err(HandlerError::Scratch)?;
            let mut scratch = self
                .storage
                .download_into(&object.bucket, &object.key, scratch, limit)
                .await?;
            let source_bytes = scratch.len();

            let extraction =
                extract_headers(&mut scratch, &object.bucket, &object.key).map_err(|source| {
                    HandlerError::Fits {
                        key: object.key.clone(),
                        source,
                    }
                })?;
            (extraction, source_bytes)
        };

        let key = output_key(&object.bucket, &object.key);
        let bytes = extraction.csv.len();
        let upload = self
            .storage
            .upload(&self.destination, &key, extraction.csv.into_bytes())
            .await?;

        self.metrics.object_extracted(extraction.rows);
        if extraction.skipped_cards > 0 {
            self.metrics.cards_skipped(extraction.skipped_cards);
        }
        info!(
            source_bucket = %object.bucket,
            source_key = %object.key,
            output_key = %key,
            source_bytes,
            hdus = extraction.hdus,
            rows = extraction.rows,
            skipped_cards = extraction.skipped_cards,
            "Header extraction written"
        );

        Ok(RecordOutcome::Written {
            bucket: self.destination.clone(),
            key,
            hdus: extraction.hdus,
            rows: extraction.rows,
            skipped_cards: extraction.skipped_cards,
            bytes,
            etag: upload.etag,
        })
    }

    async fn on_removed(&self, object: ObjectRef) -> Result<RecordOutcome, HandlerError> {
        let key = output_key(&object.bucket, &object.key);
        self.storage.delete(&self.destination, &key).await?;
        self.metrics.output_deleted();

        Ok(RecordOutcome::Deleted {
            bucket: self.destination.clone(),
            key,
        })
    }

    async fn on_unrecognized(&self, record: &EventRecord) -> Result<RecordOutcome, HandlerError> {
        info!(event_name = ?record.event_name, "Not a creation or removal, nothing to do");
        self.metrics.event_ignored();
        Ok(RecordOutcome::ignored(record.event_name.clone()))
    }
}
