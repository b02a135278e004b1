use tracing::{debug, error};

use super::traits::{HandlerError, RecordHandler};
use super::types::{BatchOutcome, EventKind, ObjectRef, S3Event};

/// Route every record of a batch to `handler`, in delivery order.
///
/// The first fatal error aborts the batch; records after it are not
/// processed and earlier side effects stay in place.
pub async fn dispatch_batch<H>(handler: &H, event: S3Event) -> Result<BatchOutcome, HandlerError>
where
    H: RecordHandler + ?Sized,
{
    let mut outcomes = Vec::with_capacity(event.records.len());

    for (position, record) in event.records.iter().enumerate() {
        let kind = record.kind();
        let result = match kind {
            EventKind::Created => match ObjectRef::from_record(record) {
                Ok(object) => handler.on_created(object).await,
                Err(e) => Err(e),
            },
            EventKind::Removed => match ObjectRef::from_record(record) {
                Ok(object) => handler.on_removed(object).await,
                Err(e) => Err(e),
            },
            EventKind::Unrecognized => handler.on_unrecognized(record).await,
        };

        match result {
            Ok(outcome) => {
                debug!(position, ?kind, summary = %outcome.summary(), "Record processed");
                outcomes.push(outcome);
            }
            Err(e) => {
                error!(position, ?kind, error = %e, "Record failed, aborting batch");
                return Err(e);
            }
        }
    }

    Ok(BatchOutcome::from_records(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::types::{EventRecord, IGNORED_MESSAGE, RecordOutcome};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl Recorder {
        fn record(&self, call: String) -> Result<(), HandlerError> {
            if self.fail_on.as_deref() == Some(call.as_str()) {
                return Err(HandlerError::InvalidRecord(call));
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl RecordHandler for Recorder {
        async fn on_created(&self, object: ObjectRef) -> Result<RecordOutcome, HandlerError> {
            self.record(format!("created {}/{}", object.bucket, object.key))?;
            Ok(RecordOutcome::Deleted {
                bucket: object.bucket,
                key: object.key,
            })
        }

        async fn on_removed(&self, object: ObjectRef) -> Result<RecordOutcome, HandlerError> {
            self.record(format!("removed {}/{}", object.bucket, object.key))?;
            Ok(RecordOutcome::Deleted {
                bucket: object.bucket,
                key: object.key,
            })
        }
    }

    fn batch(records: &[(&str, &str, &str)]) -> S3Event {
        S3Event {
            records: records
                .iter()
                .map(|(name, bucket, key)| EventRecord::new(name, bucket, key))
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_routes_by_kind_in_order() {
        let recorder = Recorder::default();
        let event = batch(&[
            ("ObjectCreated:Put", "src", "a.fits"),
            ("ObjectRemoved:Delete", "src", "b+c.fits"),
            ("ObjectTagging:Put", "src", "d.fits"),
        ]);

        let outcome = dispatch_batch(&recorder, event).await.unwrap();

        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["created src/a.fits", "removed src/b c.fits"]
        );
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(outcome.message, IGNORED_MESSAGE);
    }

    #[tokio::test]
    async fn test_unrecognized_does_not_call_mutating_hooks() {
        let recorder = Recorder::default();
        let outcome = dispatch_batch(&recorder, batch(&[("ObjectRestore:Post", "src", "a.fits")]))
            .await
            .unwrap();

        assert!(recorder.calls.lock().unwrap().is_empty());
        assert!(matches!(outcome.last(), Some(RecordOutcome::Ignored { .. })));
    }

    #[tokio::test]
    async fn test_missing_event_name_is_unrecognized() {
        let recorder = Recorder::default();
        let event = S3Event {
            records: vec![EventRecord::default()],
        };
        let outcome = dispatch_batch(&recorder, event).await.unwrap();
        assert_eq!(outcome.records, vec![RecordOutcome::ignored(None)]);
    }

    #[tokio::test]
    async fn test_first_failure_aborts_batch() {
        let recorder = Recorder {
            fail_on: Some("created src/bad.fits".to_string()),
            ..Default::default()
        };
        let event = batch(&[
            ("ObjectCreated:Put", "src", "good.fits"),
            ("ObjectCreated:Put", "src", "bad.fits"),
            ("ObjectRemoved:Delete", "src", "later.fits"),
        ]);

        let err = dispatch_batch(&recorder, event).await.unwrap_err();
        assert!(matches!(err, HandlerError::InvalidRecord(_)));
        assert_eq!(*recorder.calls.lock().unwrap(), vec!["created src/good.fits"]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let outcome = dispatch_batch(&Recorder::default(), S3Event::default()).await.unwrap();
        assert!(outcome.records.is_empty());
    }
}
