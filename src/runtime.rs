use std::fs::File;
use std::io::{BufReader, Write};
use std::sync::Arc;

use lambda_runtime::{LambdaEvent, service_fn};
use tracing::{info, warn};

use crate::cli::{ExtractArgs, ReplayArgs};
use fitslake::config::{Config, StorageProvider};
use fitslake::handlers::{EventKind, FitsHeaderHandler, ObjectRef, S3Event, extract_headers};
use fitslake::storage::StorageClient;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Serve notification batches until the runtime shuts the process down.
///
/// The storage client is built once per process and shared by every
/// invocation.
pub async fn serve(config: Config) -> Result<(), AnyError> {
    let storage = StorageClient::from_config(&config.storage);
    let handler = Arc::new(FitsHeaderHandler::from_config(&config, storage)?);

    info!(
        destination = handler.destination(),
        max_object_bytes = %config.extractor.max_object_bytes,
        "Starting function runtime"
    );

    lambda_runtime::run(service_fn(move |event: LambdaEvent<S3Event>| {
        let handler = handler.clone();
        async move {
            let LambdaEvent { payload, context } = event;
            info!(
                request_id = %context.request_id,
                records = payload.records.len(),
                "Invocation received"
            );
            handler
                .handle(payload)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
}

/// Write the CSV for a local file to stdout
pub fn extract_local(args: ExtractArgs) -> Result<(), AnyError> {
    let key = match args.key {
        Some(key) => key,
        None => args
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("{} has no file name", args.path.display()))?,
    };

    let file = File::open(&args.path)?;
    let extraction = extract_headers(BufReader::new(file), &args.bucket, &key)?;
    if extraction.skipped_cards > 0 {
        warn!(skipped = extraction.skipped_cards, "Some cards failed verification");
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(extraction.csv.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Run a recorded payload through the handler and print the outcome
pub async fn replay(config: Config, args: ReplayArgs) -> Result<(), AnyError> {
    let payload = std::fs::read_to_string(&args.event)?;
    let event: S3Event = serde_json::from_str(&payload)?;

    let storage = StorageClient::from_config(&config.storage);

    if let Some(object) = &args.object {
        if config.storage.provider != StorageProvider::Memory {
            return Err("--object needs the memory storage provider".into());
        }
        let bytes = std::fs::read(object)?;
        for record in event.records.iter().filter(|r| r.kind() == EventKind::Created) {
            let target = ObjectRef::from_record(record)?;
            storage.upload(&target.bucket, &target.key, bytes.clone()).await?;
        }
    }

    let handler = FitsHeaderHandler::from_config(&config, storage)?;
    let outcome = handler.handle(event).await?;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
