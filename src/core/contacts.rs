use crate::config::TableConfig;
use crate::core::{
    collect_pages, email_variants, find_existing_key, single_key, BulkOutcome, KeyValueStore,
    Record,
};
use crate::domain::model::Contact;
use crate::utils::error::{OpsError, Result};

pub async fn list_contacts<S: KeyValueStore>(store: &S, table: &TableConfig) -> Result<Vec<Contact>> {
    let name = table.name.as_str();
    let records = collect_pages(None, move |cursor| store.scan_page(name, None, cursor)).await?;

    let mut contacts: Vec<Contact> = records.iter().filter_map(Contact::from_record).collect();
    contacts.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(contacts)
}

pub async fn add_contact<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    email: &str,
    name: Option<&str>,
) -> Result<()> {
    if !email.contains('@') {
        return Err(OpsError::InvalidConfigValueError {
            field: "email".to_string(),
            value: email.to_string(),
            reason: "Not an email address".to_string(),
        });
    }

    let mut item = single_key(table, &email.to_ascii_lowercase())?;
    if let Some(name) = name {
        item = item.with("name", name);
    }
    store.put_item(&table.name, item).await?;
    tracing::info!("➕ Added contact {}", email);
    Ok(())
}

pub async fn delete_contact<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    email: &str,
) -> Result<()> {
    let candidates = email_variants(email)
        .iter()
        .map(|candidate| single_key(table, candidate))
        .collect::<Result<Vec<_>>>()?;
    let key = find_existing_key(store, &table.name, candidates)
        .await?
        .ok_or_else(|| OpsError::not_found(format!("contact {}", email)))?;

    let target = key.describe();
    store.delete_item(&table.name, key).await?;
    tracing::info!("🗑️ Deleted contact {}", target);
    Ok(())
}

/// Deletes every item in the contacts table.
///
/// The read phase follows the scan to its last page before anything is
/// deleted, so each observed item is attempted exactly once. A failed delete
/// is recorded and the run moves on; there is no rollback.
pub async fn purge_contacts<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    dry_run: bool,
) -> Result<BulkOutcome> {
    let name = table.name.as_str();
    let records: Vec<Record> =
        collect_pages(None, move |cursor| store.scan_page(name, None, cursor)).await?;
    tracing::info!("📋 Scanned {} items from {}", records.len(), name);

    if dry_run {
        return Ok(BulkOutcome::dry_run(records.len()));
    }

    let mut outcome = BulkOutcome {
        scanned: records.len(),
        ..BulkOutcome::default()
    };

    for record in &records {
        let Some(key) = record.key_for(&table.key) else {
            tracing::warn!("Skipping item without key attributes: {}", record.describe());
            outcome.skipped += 1;
            continue;
        };

        let target = key.describe();
        match store.delete_item(name, key).await {
            Ok(()) => outcome.succeeded += 1,
            Err(e) => outcome.record_failure(target, &e),
        }
    }

    tracing::info!(
        "🗑️ Deleted {} of {} contacts ({} skipped, {} failed)",
        outcome.succeeded,
        outcome.scanned,
        outcome.skipped,
        outcome.failures.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MemoryStore;

    fn contacts_table() -> TableConfig {
        TableConfig {
            name: "Contacts".to_string(),
            key: vec!["email".to_string()],
        }
    }

    fn contact(i: usize) -> Record {
        Record::new()
            .with("email", format!("user{}@example.com", i))
            .with("name", format!("User {}", i))
    }

    #[tokio::test]
    async fn test_purge_covers_every_page() {
        let items: Vec<Record> = (0..7).map(contact).collect();
        let store = MemoryStore::new(3).with_items("Contacts", items);

        let outcome = purge_contacts(&store, &contacts_table(), false).await.unwrap();

        assert_eq!(outcome.scanned, 7);
        assert_eq!(outcome.succeeded, 7);
        assert!(outcome.is_complete());
        assert!(store.items("Contacts").is_empty());

        // 只把 key 屬性送進刪除
        let deletes = store.deletes.lock().unwrap();
        assert_eq!(deletes.len(), 7);
        assert!(deletes.iter().all(|key| key.data.len() == 1));
    }

    #[tokio::test]
    async fn test_purge_continues_after_failure() {
        let items: Vec<Record> = (0..4).map(contact).collect();
        let bad_key = Record::new().with("email", "user1@example.com");
        let store = MemoryStore::new(10)
            .with_items("Contacts", items)
            .failing_on(&bad_key);

        let outcome = purge_contacts(&store, &contacts_table(), false).await.unwrap();

        assert_eq!(outcome.succeeded, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "email=user1@example.com");
        assert_eq!(store.items("Contacts").len(), 1);
    }

    #[tokio::test]
    async fn test_purge_skips_items_without_key() {
        let items = vec![contact(0), Record::new().with("name", "orphan")];
        let store = MemoryStore::new(10).with_items("Contacts", items);

        let outcome = purge_contacts(&store, &contacts_table(), false).await.unwrap();

        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[tokio::test]
    async fn test_purge_dry_run_deletes_nothing() {
        let items: Vec<Record> = (0..5).map(contact).collect();
        let store = MemoryStore::new(2).with_items("Contacts", items);

        let outcome = purge_contacts(&store, &contacts_table(), true).await.unwrap();

        assert!(outcome.dry_run);
        assert_eq!(outcome.scanned, 5);
        assert_eq!(store.items("Contacts").len(), 5);
    }

    #[tokio::test]
    async fn test_list_and_add_contacts() {
        let store = MemoryStore::new(2).with_items("Contacts", vec![contact(2), contact(1)]);

        add_contact(&store, &contacts_table(), "New@Example.com", Some("New"))
            .await
            .unwrap();
        assert!(add_contact(&store, &contacts_table(), "not-an-email", None)
            .await
            .is_err());

        let contacts = list_contacts(&store, &contacts_table()).await.unwrap();
        let emails: Vec<&str> = contacts.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(
            emails,
            vec!["new@example.com", "user1@example.com", "user2@example.com"]
        );
    }

    #[tokio::test]
    async fn test_delete_single_contact() {
        let store = MemoryStore::new(10).with_items("Contacts", vec![contact(1), contact(2)]);

        delete_contact(&store, &contacts_table(), "user1@example.com")
            .await
            .unwrap();

        let remaining = store.items("Contacts");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].get_str("email"), Some("user2@example.com"));
    }

    #[tokio::test]
    async fn test_delete_matches_address_case_insensitively() {
        let stored = Record::new().with("email", "Jane.Doe@Example.org");
        let store = MemoryStore::new(10).with_items("Contacts", vec![stored, contact(1)]);

        // 以原本大小寫儲存的地址
        delete_contact(&store, &contacts_table(), "Jane.Doe@Example.org")
            .await
            .unwrap();
        assert_eq!(store.items("Contacts").len(), 1);

        // 由本工具寫入的地址一律小寫
        add_contact(&store, &contacts_table(), "Bob@Example.com", None)
            .await
            .unwrap();
        delete_contact(&store, &contacts_table(), "BOB@example.COM")
            .await
            .unwrap();
        assert_eq!(store.items("Contacts").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_contact_is_not_found() {
        let store = MemoryStore::new(10).with_items("Contacts", vec![contact(1)]);

        let result = delete_contact(&store, &contacts_table(), "nobody@example.com").await;
        assert!(matches!(result, Err(OpsError::NotFound { .. })));
        assert!(store.deletes.lock().unwrap().is_empty());
        assert_eq!(store.items("Contacts").len(), 1);
    }
}
