use crate::core::{collect_pages, BulkOutcome, ObjectStore};
use crate::domain::model::ObjectEntry;
use crate::utils::error::{OpsError, Result};

pub async fn list_objects<O: ObjectStore>(store: &O, prefix: Option<&str>) -> Result<Vec<ObjectEntry>> {
    collect_pages(None, move |token| store.list_page(prefix, token)).await
}

pub async fn download_object<O: ObjectStore>(store: &O, key: &str) -> Result<Vec<u8>> {
    let data = store.read_object(key).await?;
    tracing::info!("📥 Read {} bytes from {}", data.len(), store.location(key));
    Ok(data)
}

pub async fn delete_object<O: ObjectStore>(store: &O, key: &str) -> Result<()> {
    store.delete_object(key).await?;
    tracing::info!("🗑️ Deleted {}", store.location(key));
    Ok(())
}

/// Deletes every object under `prefix`. An empty prefix is refused.
pub async fn purge_prefix<O: ObjectStore>(
    store: &O,
    prefix: &str,
    dry_run: bool,
) -> Result<BulkOutcome> {
    if prefix.trim().is_empty() {
        return Err(OpsError::InvalidConfigValueError {
            field: "prefix".to_string(),
            value: prefix.to_string(),
            reason: "Refusing to purge the whole bucket; give a non-empty prefix".to_string(),
        });
    }

    let entries = list_objects(store, Some(prefix)).await?;
    tracing::info!("📋 Found {} objects under {}", entries.len(), store.location(prefix));

    if dry_run {
        return Ok(BulkOutcome::dry_run(entries.len()));
    }

    let mut outcome = BulkOutcome {
        scanned: entries.len(),
        ..BulkOutcome::default()
    };
    for entry in &entries {
        match store.delete_object(&entry.key).await {
            Ok(()) => outcome.succeeded += 1,
            Err(e) => outcome.record_failure(entry.key.clone(), &e),
        }
    }

    tracing::info!(
        "🗑️ Deleted {} of {} objects ({} failed)",
        outcome.succeeded,
        outcome.scanned,
        outcome.failures.len()
    );
    Ok(outcome)
}
