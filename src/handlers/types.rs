use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use super::traits::HandlerError;

/// Event name prefix of object creations (`ObjectCreated:Put`, `ObjectCreated:Copy`, ...)
pub const CREATED_PREFIX: &str = "ObjectCreated";
/// Event name prefix of object removals (`ObjectRemoved:Delete`, ...)
pub const REMOVED_PREFIX: &str = "ObjectRemoved";

/// Informational result for records that are neither creations nor removals
pub const IGNORED_MESSAGE: &str = "not a ObjectCreated or ObjectRemoved action. do nothing";

/// Storage notification payload delivered to the function
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

/// One object mutation. Fields the handler does not read are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<S3Entity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: BucketEntity,
    #[serde(default)]
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BucketEntity {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ObjectEntity {
    /// Form-encoded key (`+` for space, `%XX` escapes)
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl EventRecord {
    pub fn new(event_name: &str, bucket: &str, key: &str) -> Self {
        Self {
            event_name: Some(event_name.to_string()),
            s3: Some(S3Entity {
                bucket: BucketEntity {
                    name: Some(bucket.to_string()),
                },
                object: ObjectEntity {
                    key: Some(key.to_string()),
                    size: None,
                },
            }),
        }
    }

    pub fn kind(&self) -> EventKind {
        EventKind::from_event_name(self.event_name.as_deref())
    }
}

/// Closed set of record kinds the handler distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Created,
    Removed,
    Unrecognized,
}

impl EventKind {
    /// Classify a raw platform event name by prefix. A missing name is unrecognized.
    pub fn from_event_name(name: Option<&str>) -> Self {
        match name {
            Some(n) if n.starts_with(CREATED_PREFIX) => EventKind::Created,
            Some(n) if n.starts_with(REMOVED_PREFIX) => EventKind::Removed,
            _ => EventKind::Unrecognized,
        }
    }
}

/// Source object addressed by a record, with its key decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn from_record(record: &EventRecord) -> Result<Self, HandlerError> {
        let entity = record
            .s3
            .as_ref()
            .ok_or_else(|| HandlerError::InvalidRecord("missing s3 entity".to_string()))?;
        let bucket = entity
            .bucket
            .name
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| HandlerError::InvalidRecord("missing bucket name".to_string()))?;
        let key = entity
            .object
            .key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| HandlerError::InvalidRecord("missing object key".to_string()))?;

        Ok(Self {
            bucket: bucket.to_string(),
            key: decode_key(key),
        })
    }
}

/// Decode a form-encoded object key: `+` is a space, `%XX` an escaped byte.
pub fn decode_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// What happened to one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecordOutcome {
    Written {
        bucket: String,
        key: String,
        hdus: usize,
        rows: usize,
        skipped_cards: usize,
        bytes: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        etag: Option<String>,
    },
    Deleted {
        bucket: String,
        key: String,
    },
    Ignored {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_name: Option<String>,
        message: String,
    },
}

impl RecordOutcome {
    pub fn ignored(event_name: Option<String>) -> Self {
        RecordOutcome::Ignored {
            event_name,
            message: IGNORED_MESSAGE.to_string(),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            RecordOutcome::Written { bucket, key, rows, .. } => {
                format!("wrote {rows} rows to {bucket}/{key}")
            }
            RecordOutcome::Deleted { bucket, key } => format!("deleted {bucket}/{key}"),
            RecordOutcome::Ignored { message, .. } => message.clone(),
        }
    }
}

/// Result of one invocation: every record's outcome in delivery order.
///
/// `message` repeats the summary of the last record for callers that only
/// look at a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub message: String,
    pub records: Vec<RecordOutcome>,
}

impl BatchOutcome {
    pub fn from_records(records: Vec<RecordOutcome>) -> Self {
        let message = records
            .last()
            .map(RecordOutcome::summary)
            .unwrap_or_else(|| "no records".to_string());
        Self { message, records }
    }

    pub fn last(&self) -> Option<&RecordOutcome> {
        self.records.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_kind_prefixes() {
        assert_eq!(EventKind::from_event_name(Some("ObjectCreated:Put")), EventKind::Created);
        assert_eq!(
            EventKind::from_event_name(Some("ObjectCreated:CompleteMultipartUpload")),
            EventKind::Created
        );
        assert_eq!(EventKind::from_event_name(Some("ObjectRemoved:Delete")), EventKind::Removed);
        assert_eq!(
            EventKind::from_event_name(Some("ObjectRestore:Completed")),
            EventKind::Unrecognized
        );
        assert_eq!(EventKind::from_event_name(None), EventKind::Unrecognized);
    }

    #[test]
    fn test_decode_key() {
        assert_eq!(decode_key("a%2Bb.fits"), "a+b.fits");
        assert_eq!(decode_key("raw/night+1/img%201.fits"), "raw/night 1/img 1.fits");
        assert_eq!(decode_key("caf%C3%A9.fits"), "café.fits");
        assert_eq!(decode_key("plain.fits"), "plain.fits");
    }

    #[test]
    fn test_deserialize_notification() {
        let payload = json!({
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "us-east-1",
                "eventTime": "2024-05-01T10:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "bucket": { "name": "src", "arn": "arn:aws:s3:::src" },
                    "object": { "key": "a%2Bb.fits", "size": 5760, "eTag": "abc" }
                }
            }]
        });

        let event: S3Event = serde_json::from_value(payload).unwrap();
        assert_eq!(event.records.len(), 1);

        let record = &event.records[0];
        assert_eq!(record.kind(), EventKind::Created);
        let object = ObjectRef::from_record(record).unwrap();
        assert_eq!(object.bucket, "src");
        assert_eq!(object.key, "a+b.fits");
    }

    #[test]
    fn test_record_without_key_is_invalid() {
        let record = EventRecord {
            event_name: Some("ObjectRemoved:Delete".to_string()),
            s3: Some(S3Entity::default()),
        };
        assert!(matches!(
            ObjectRef::from_record(&record),
            Err(HandlerError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_batch_message_follows_last_record() {
        let outcome = BatchOutcome::from_records(vec![
            RecordOutcome::Deleted {
                bucket: "dest".to_string(),
                key: "src/a.fits/data.csv".to_string(),
            },
            RecordOutcome::ignored(Some("ObjectTagging:Put".to_string())),
        ]);
        assert_eq!(outcome.message, IGNORED_MESSAGE);
        assert_eq!(outcome.records.len(), 2);

        assert_eq!(BatchOutcome::from_records(Vec::new()).message, "no records");
    }

    #[test]
    fn test_outcome_serialization() {
        let value = serde_json::to_value(RecordOutcome::Deleted {
            bucket: "dest".to_string(),
            key: "src/a.fits/data.csv".to_string(),
        })
        .unwrap();
        assert_eq!(
            value,
            json!({ "action": "deleted", "bucket": "dest", "key": "src/a.fits/data.csv" })
        );
    }
}
