use crate::config::ops_config::TablesConfig;
use crate::config::TableConfig;
use crate::core::{collect_pages, single_key, BulkOutcome, KeyValueStore};
use crate::domain::model::{
    Campaign, CampaignStatus, DeliveryStatus, FieldChange, Filter, Recipient,
};
use crate::utils::error::{OpsError, Result};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignStats {
    pub campaign_id: String,
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl CampaignStats {
    pub fn count(&self, status: &DeliveryStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

pub async fn list_campaigns<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    status: Option<&str>,
) -> Result<Vec<Campaign>> {
    let name = table.name.as_str();
    let filter = status.map(|s| Filter::eq("status", CampaignStatus::from(s.to_string()).as_str()));
    let filter = filter.as_ref();

    let records =
        collect_pages(None, move |cursor| store.scan_page(name, filter, cursor)).await?;

    let mut campaigns: Vec<Campaign> = records.iter().filter_map(Campaign::from_record).collect();
    campaigns.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.campaign_id.cmp(&b.campaign_id))
    });
    Ok(campaigns)
}

pub async fn show_campaign<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    campaign_id: &str,
) -> Result<Campaign> {
    let key = single_key(table, campaign_id)?;
    let record = store
        .get_item(&table.name, key)
        .await?
        .ok_or_else(|| OpsError::not_found(format!("campaign {}", campaign_id)))?;

    Campaign::from_record(&record).ok_or_else(|| OpsError::ProcessingError {
        message: format!("campaign {} has no campaign_id attribute", campaign_id),
    })
}

async fn recipients_of<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    campaign_id: &str,
) -> Result<Vec<Recipient>> {
    let name = table.name.as_str();
    let filter = Filter::eq("campaign_id", campaign_id);
    let filter = &filter;

    let records =
        collect_pages(None, move |cursor| store.scan_page(name, Some(filter), cursor)).await?;

    Ok(records.iter().filter_map(Recipient::from_record).collect())
}

pub async fn campaign_stats<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    campaign_id: &str,
) -> Result<CampaignStats> {
    let recipients = recipients_of(store, table, campaign_id).await?;

    let mut by_status = BTreeMap::new();
    for recipient in &recipients {
        *by_status
            .entry(recipient.status.as_str().to_string())
            .or_insert(0) += 1;
    }

    Ok(CampaignStats {
        campaign_id: campaign_id.to_string(),
        total: recipients.len(),
        by_status,
    })
}

/// Recipients whose delivery failed or bounced, sorted by email.
pub async fn list_failures<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    campaign_id: &str,
) -> Result<Vec<Recipient>> {
    let mut failures: Vec<Recipient> = recipients_of(store, table, campaign_id)
        .await?
        .into_iter()
        .filter(|r| r.status.is_failure())
        .collect();
    failures.sort_by(|a, b| a.email.cmp(&b.email));
    Ok(failures)
}

pub async fn set_campaign_status<S: KeyValueStore>(
    store: &S,
    table: &TableConfig,
    campaign_id: &str,
    status: &str,
) -> Result<CampaignStatus> {
    let status = CampaignStatus::from(status.to_string());
    if let CampaignStatus::Other(value) = &status {
        tracing::warn!("⚠️ '{}' is not a known campaign status", value);
    }

    // UpdateItem 會建立不存在的項目，先確認存在
    let previous = show_campaign(store, table, campaign_id).await?;
    let key = single_key(table, campaign_id)?;
    store
        .update_item(
            &table.name,
            key,
            vec![FieldChange::Set(
                "status".to_string(),
                status.as_str().into(),
            )],
        )
        .await?;

    tracing::info!(
        "🔧 Campaign {}: {} -> {}",
        campaign_id,
        previous.status,
        status
    );
    Ok(previous.status)
}

/// Puts every `failed` recipient of a campaign back to `pending`.
pub async fn reset_failed<S: KeyValueStore>(
    store: &S,
    tables: &TablesConfig,
    campaign_id: &str,
    dry_run: bool,
) -> Result<BulkOutcome> {
    let table = &tables.recipients;
    let failed: Vec<Recipient> = recipients_of(store, table, campaign_id)
        .await?
        .into_iter()
        .filter(|r| r.status == DeliveryStatus::Failed)
        .collect();

    if dry_run {
        return Ok(BulkOutcome::dry_run(failed.len()));
    }

    let mut outcome = BulkOutcome {
        scanned: failed.len(),
        ..BulkOutcome::default()
    };

    for recipient in failed {
        let key = crate::core::composite_key(table, &recipient.campaign_id, &recipient.email)?;
        let changes = vec![
            FieldChange::Set("status".to_string(), DeliveryStatus::Pending.as_str().into()),
            FieldChange::Remove("error_message".to_string()),
        ];
        match store.update_item(&table.name, key, changes).await {
            Ok(()) => outcome.succeeded += 1,
            Err(e) => outcome.record_failure(recipient.email.clone(), &e),
        }
    }

    tracing::info!(
        "🔁 Reset {} of {} failed recipients of campaign {}",
        outcome.succeeded,
        outcome.scanned,
        campaign_id
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MemoryStore;
    use crate::core::Record;

    fn campaign(id: &str, status: &str, created_at: &str) -> Record {
        Record::new()
            .with("campaign_id", id)
            .with("subject", format!("Subject {}", id))
            .with("body", "<p>Hello</p>")
            .with("status", status)
            .with("created_at", created_at)
    }

    fn recipient(campaign_id: &str, email: &str, status: &str, error: Option<&str>) -> Record {
        let record = Record::new()
            .with("campaign_id", campaign_id)
            .with("email", email)
            .with("status", status);
        match error {
            Some(error) => record.with("error_message", error),
            None => record,
        }
    }

    fn seeded() -> MemoryStore {
        MemoryStore::new(2)
            .with_items(
                "Campaigns",
                vec![
                    campaign("c2", "sent", "2024-03-02"),
                    campaign("c1", "draft", "2024-03-01"),
                    campaign("c3", "sent", "2024-03-03"),
                ],
            )
            .with_items(
                "CampaignRecipients",
                vec![
                    recipient("c1", "b@example.com", "failed", Some("550 mailbox full")),
                    recipient("c1", "a@example.com", "sent", None),
                    recipient("c2", "a@example.com", "sent", None),
                    recipient("c1", "c@example.com", "bounced", Some("5.1.1 unknown user")),
                    recipient("c1", "d@example.com", "failed", None),
                ],
            )
    }

    #[tokio::test]
    async fn test_list_campaigns_sorted_and_filtered() {
        let store = seeded();
        let tables = TablesConfig::default();

        let all = list_campaigns(&store, &tables.campaigns, None).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);

        let sent = list_campaigns(&store, &tables.campaigns, Some("SENT"))
            .await
            .unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|c| c.status == CampaignStatus::Sent));
    }

    #[tokio::test]
    async fn test_show_missing_campaign_is_not_found() {
        let store = seeded();
        let tables = TablesConfig::default();

        let err = show_campaign(&store, &tables.campaigns, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, OpsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_stats_and_failures_span_pages() {
        let store = seeded();
        let tables = TablesConfig::default();

        let stats = campaign_stats(&store, &tables.recipients, "c1").await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.count(&DeliveryStatus::Failed), 2);
        assert_eq!(stats.count(&DeliveryStatus::Bounced), 1);
        assert_eq!(stats.count(&DeliveryStatus::Pending), 0);

        let failures = list_failures(&store, &tables.recipients, "c1").await.unwrap();
        let emails: Vec<&str> = failures.iter().map(|r| r.email.as_str()).collect();
        assert_eq!(emails, vec!["b@example.com", "c@example.com", "d@example.com"]);
        assert_eq!(failures[0].error_message.as_deref(), Some("550 mailbox full"));
    }

    #[tokio::test]
    async fn test_set_status_requires_existing_campaign() {
        let store = seeded();
        let tables = TablesConfig::default();

        let previous = set_campaign_status(&store, &tables.campaigns, "c1", "scheduled")
            .await
            .unwrap();
        assert_eq!(previous, CampaignStatus::Draft);
        let updated = show_campaign(&store, &tables.campaigns, "c1").await.unwrap();
        assert_eq!(updated.status, CampaignStatus::Scheduled);

        assert!(set_campaign_status(&store, &tables.campaigns, "ghost", "sent")
            .await
            .is_err());
        assert_eq!(store.items("Campaigns").len(), 3);
    }

    #[tokio::test]
    async fn test_reset_failed_only_touches_failed() {
        let store = seeded();
        let tables = TablesConfig::default();

        let outcome = reset_failed(&store, &tables, "c1", false).await.unwrap();
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.succeeded, 2);

        let stats = campaign_stats(&store, &tables.recipients, "c1").await.unwrap();
        assert_eq!(stats.count(&DeliveryStatus::Pending), 2);
        assert_eq!(stats.count(&DeliveryStatus::Bounced), 1);

        let reset = store
            .items("CampaignRecipients")
            .into_iter()
            .find(|r| r.get_str("email") == Some("b@example.com"))
            .unwrap();
        assert!(reset.get_str("error_message").is_none());
    }
}
