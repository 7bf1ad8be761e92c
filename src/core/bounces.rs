use crate::config::ops_config::TablesConfig;
use crate::core::{
    composite_key, email_variants, find_existing_key, single_key, BulkOutcome, KeyValueStore,
    Mailbox,
};
use crate::domain::model::{Bounce, DeliveryStatus, FieldChange, RawMessage};
use crate::utils::error::{OpsError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::HashMap;

/// Extracts delivery status notification fields from a raw message.
pub struct BounceParser {
    final_recipient: Regex,
    original_recipient: Regex,
    status: Regex,
    diagnostic: Regex,
    campaign_id: Regex,
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| OpsError::ProcessingError {
        message: format!("invalid bounce pattern {}: {}", pattern, e),
    })
}

impl BounceParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            final_recipient: compile(
                r"(?mi)^Final-Recipient:\s*(?:[\w-]+\s*;\s*)?<?([^\s<>;]+@[^\s<>;]+)>?",
            )?,
            original_recipient: compile(
                r"(?mi)^Original-Recipient:\s*(?:[\w-]+\s*;\s*)?<?([^\s<>;]+@[^\s<>;]+)>?",
            )?,
            status: compile(r"(?mi)^Status:\s*([245]\.\d{1,3}\.\d{1,3})")?,
            diagnostic: compile(r"(?mi)^Diagnostic-Code:\s*(?:[\w-]+\s*;\s*)?(.*(?:\r?\n[ \t]+.*)*)")?,
            campaign_id: compile(r"(?mi)^X-Campaign-Id:\s*(\S+)")?,
        })
    }

    /// `None` when the message is not a bounce (no failed recipient).
    pub fn parse(&self, raw: &[u8]) -> Option<Bounce> {
        let text = String::from_utf8_lossy(raw);
        let capture = |re: &Regex| -> Option<String> {
            re.captures(&text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        };

        let recipient =
            capture(&self.final_recipient).or_else(|| capture(&self.original_recipient))?;

        let diagnostic = capture(&self.diagnostic)
            .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|d| !d.is_empty());

        Some(Bounce {
            recipient,
            status_code: capture(&self.status),
            diagnostic,
            campaign_id: capture(&self.campaign_id),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BounceScan {
    pub messages: usize,
    pub bounces: Vec<Bounce>,
}

/// One bounce per (address, campaign). A permanent failure replaces an
/// earlier transient one for the same pair.
pub fn parse_messages(parser: &BounceParser, messages: &[RawMessage]) -> BounceScan {
    let mut index: HashMap<(String, Option<String>), usize> = HashMap::new();
    let mut bounces: Vec<Bounce> = Vec::new();

    for message in messages {
        match parser.parse(&message.body) {
            Some(bounce) => {
                let key = (
                    bounce.recipient.to_ascii_lowercase(),
                    bounce.campaign_id.clone(),
                );
                match index.get(&key) {
                    Some(&i) => {
                        // 延遲通知 (4.x.x) 之後常跟著最終失敗通知
                        if !bounces[i].is_permanent() && bounce.is_permanent() {
                            bounces[i] = bounce;
                        }
                    }
                    None => {
                        index.insert(key, bounces.len());
                        bounces.push(bounce);
                    }
                }
            }
            None => tracing::debug!("Message {:?} is not a bounce", message.uid),
        }
    }

    BounceScan {
        messages: messages.len(),
        bounces,
    }
}

pub async fn scan_bounces<M: Mailbox>(
    mailbox: &M,
    folder: &str,
    since: Option<NaiveDate>,
) -> Result<BounceScan> {
    let parser = BounceParser::new()?;
    let messages = mailbox.fetch_messages(folder, since).await?;
    let scan = parse_messages(&parser, &messages);
    tracing::info!(
        "📬 {} messages in {}, {} bounces",
        scan.messages,
        folder,
        scan.bounces.len()
    );
    Ok(scan)
}

async fn apply_one<S: KeyValueStore>(
    store: &S,
    tables: &TablesConfig,
    bounce: &Bounce,
) -> Result<bool> {
    let mut touched = false;

    let addresses = email_variants(&bounce.recipient);

    let contact_keys = addresses
        .iter()
        .map(|address| single_key(&tables.contacts, address))
        .collect::<Result<Vec<_>>>()?;
    if let Some(contact_key) =
        find_existing_key(store, &tables.contacts.name, contact_keys).await?
    {
        store
            .update_item(
                &tables.contacts.name,
                contact_key,
                vec![FieldChange::Set(
                    "status".to_string(),
                    DeliveryStatus::Bounced.as_str().into(),
                )],
            )
            .await?;
        touched = true;
    }

    if let Some(campaign_id) = &bounce.campaign_id {
        let recipient_keys = addresses
            .iter()
            .map(|address| composite_key(&tables.recipients, campaign_id, address))
            .collect::<Result<Vec<_>>>()?;
        if let Some(recipient_key) =
            find_existing_key(store, &tables.recipients.name, recipient_keys).await?
        {
            let message = bounce
                .diagnostic
                .clone()
                .or_else(|| bounce.status_code.clone())
                .unwrap_or_else(|| "bounced".to_string());
            store
                .update_item(
                    &tables.recipients.name,
                    recipient_key,
                    vec![
                        FieldChange::Set(
                            "status".to_string(),
                            DeliveryStatus::Bounced.as_str().into(),
                        ),
                        FieldChange::Set("error_message".to_string(), message.into()),
                    ],
                )
                .await?;
            touched = true;
        }
    }

    Ok(touched)
}

/// Marks contacts and campaign recipients of permanent bounces as `bounced`.
/// Transient (4.x.x) bounces and addresses with no matching record are skipped.
pub async fn apply_bounces<S: KeyValueStore>(
    store: &S,
    tables: &TablesConfig,
    bounces: &[Bounce],
    dry_run: bool,
) -> Result<BulkOutcome> {
    let permanent: Vec<&Bounce> = bounces.iter().filter(|b| b.is_permanent()).collect();
    let transient = bounces.len() - permanent.len();
    if dry_run {
        return Ok(BulkOutcome {
            skipped: transient,
            ..BulkOutcome::dry_run(bounces.len())
        });
    }

    let mut outcome = BulkOutcome {
        scanned: bounces.len(),
        skipped: transient,
        ..BulkOutcome::default()
    };

    for bounce in permanent {
        match apply_one(store, tables, bounce).await {
            Ok(true) => outcome.succeeded += 1,
            Ok(false) => {
                tracing::debug!("No record matches bounced address {}", bounce.recipient);
                outcome.skipped += 1;
            }
            Err(e) => outcome.record_failure(bounce.recipient.clone(), &e),
        }
    }

    tracing::info!(
        "📮 Marked {} bounced addresses ({} skipped, {} failed)",
        outcome.succeeded,
        outcome.skipped,
        outcome.failures.len()
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::MemoryStore;
    use crate::core::Record;

    const DSN: &str = "From: MAILER-DAEMON@mail.example.com\r\n\
Subject: Undelivered Mail Returned to Sender\r\n\
Content-Type: multipart/report; report-type=delivery-status; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: message/delivery-status\r\n\
\r\n\
Reporting-MTA: dns; mail.example.com\r\n\
\r\n\
Final-Recipient: rfc822; Jane.Doe@Example.org\r\n\
Original-Recipient: rfc822;jane@example.org\r\n\
Action: failed\r\n\
Status: 5.1.1\r\n\
Diagnostic-Code: smtp; 550 5.1.1 <jane.doe@example.org>: Recipient address\r\n\
\x20   rejected: User unknown\r\n\
\r\n\
--b1\r\n\
Content-Type: text/rfc822-headers\r\n\
\r\n\
X-Campaign-Id: spring-sale\r\n\
To: jane.doe@example.org\r\n\
--b1--\r\n";

    #[test]
    fn test_parse_dsn() {
        let parser = BounceParser::new().unwrap();
        let bounce = parser.parse(DSN.as_bytes()).unwrap();

        // 保留原始大小寫，比對時才轉小寫
        assert_eq!(bounce.recipient, "Jane.Doe@Example.org");
        assert_eq!(bounce.status_code.as_deref(), Some("5.1.1"));
        assert_eq!(
            bounce.diagnostic.as_deref(),
            Some("550 5.1.1 <jane.doe@example.org>: Recipient address rejected: User unknown")
        );
        assert_eq!(bounce.campaign_id.as_deref(), Some("spring-sale"));
        assert!(bounce.is_permanent());
    }

    #[test]
    fn test_parse_ignores_regular_mail() {
        let parser = BounceParser::new().unwrap();
        let message = b"From: someone@example.com\r\nSubject: Re: your offer\r\n\r\nThanks!\r\n";
        assert!(parser.parse(message).is_none());
    }

    #[test]
    fn test_parse_transient_without_campaign() {
        let parser = BounceParser::new().unwrap();
        let message = b"Original-Recipient: rfc822; <bob@example.net>\nStatus: 4.2.2\n";
        let bounce = parser.parse(message).unwrap();
        assert_eq!(bounce.recipient, "bob@example.net");
        assert!(!bounce.is_permanent());
        assert!(bounce.campaign_id.is_none());
        assert!(bounce.diagnostic.is_none());
    }

    #[test]
    fn test_parse_messages_dedupes() {
        let parser = BounceParser::new().unwrap();
        let messages = vec![
            RawMessage {
                uid: Some(1),
                body: DSN.as_bytes().to_vec(),
            },
            RawMessage {
                uid: Some(2),
                body: DSN.as_bytes().to_vec(),
            },
            RawMessage {
                uid: Some(3),
                body: b"Subject: hello\r\n\r\nhi".to_vec(),
            },
        ];

        let scan = parse_messages(&parser, &messages);
        assert_eq!(scan.messages, 3);
        assert_eq!(scan.bounces.len(), 1);
    }

    #[tokio::test]
    async fn test_permanent_bounce_wins_over_earlier_delay() {
        let delayed = "Final-Recipient: rfc822; jane@example.org\r\n\
Action: delayed\r\n\
Status: 4.2.2\r\n\
X-Campaign-Id: spring-sale\r\n";
        let failed = "Final-Recipient: rfc822; JANE@example.org\r\n\
Action: failed\r\n\
Status: 5.1.1\r\n\
X-Campaign-Id: spring-sale\r\n";
        let messages = vec![
            RawMessage {
                uid: Some(1),
                body: delayed.as_bytes().to_vec(),
            },
            RawMessage {
                uid: Some(2),
                body: failed.as_bytes().to_vec(),
            },
            RawMessage {
                uid: Some(3),
                body: delayed.as_bytes().to_vec(),
            },
        ];

        let scan = parse_messages(&BounceParser::new().unwrap(), &messages);
        assert_eq!(scan.bounces.len(), 1);
        assert_eq!(scan.bounces[0].status_code.as_deref(), Some("5.1.1"));

        let store = MemoryStore::new(10)
            .with_items("Contacts", vec![Record::new().with("email", "jane@example.org")]);
        let outcome = apply_bounces(&store, &TablesConfig::default(), &scan.bounces, false)
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(store.items("Contacts")[0].get_str("status"), Some("bounced"));
    }

    #[tokio::test]
    async fn test_apply_bounces_finds_mixed_case_records() {
        let store = MemoryStore::new(10)
            .with_items(
                "Contacts",
                vec![Record::new().with("email", "Jane.Doe@Example.org")],
            )
            .with_items(
                "CampaignRecipients",
                vec![Record::new()
                    .with("campaign_id", "spring-sale")
                    .with("email", "Jane.Doe@Example.org")
                    .with("status", "sent")],
            );
        let bounce = BounceParser::new().unwrap().parse(DSN.as_bytes()).unwrap();

        let outcome = apply_bounces(&store, &TablesConfig::default(), &[bounce], false)
            .await
            .unwrap();
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(store.items("Contacts").len(), 1);
        assert_eq!(store.items("Contacts")[0].get_str("status"), Some("bounced"));
        assert_eq!(store.items("CampaignRecipients").len(), 1);
        assert_eq!(
            store.items("CampaignRecipients")[0].get_str("status"),
            Some("bounced")
        );
    }

    #[tokio::test]
    async fn test_apply_bounces_marks_contact_and_recipient() {
        let tables = TablesConfig::default();
        let store = MemoryStore::new(10)
            .with_items(
                "Contacts",
                vec![Record::new().with("email", "jane.doe@example.org")],
            )
            .with_items(
                "CampaignRecipients",
                vec![Record::new()
                    .with("campaign_id", "spring-sale")
                    .with("email", "jane.doe@example.org")
                    .with("status", "sent")],
            );

        let bounces = vec![
            BounceParser::new().unwrap().parse(DSN.as_bytes()).unwrap(),
            Bounce {
                recipient: "ghost@example.org".to_string(),
                status_code: Some("5.1.1".to_string()),
                diagnostic: None,
                campaign_id: None,
            },
            Bounce {
                recipient: "busy@example.org".to_string(),
                status_code: Some("4.2.2".to_string()),
                diagnostic: None,
                campaign_id: None,
            },
        ];

        let outcome = apply_bounces(&store, &tables, &bounces, false).await.unwrap();
        assert_eq!(outcome.scanned, 3);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.skipped, 2);

        // 不存在的聯絡人不會被建立
        assert_eq!(store.items("Contacts").len(), 1);
        assert_eq!(store.items("Contacts")[0].get_str("status"), Some("bounced"));

        let recipient = &store.items("CampaignRecipients")[0];
        assert_eq!(recipient.get_str("status"), Some("bounced"));
        assert!(recipient
            .get_str("error_message")
            .unwrap()
            .contains("User unknown"));
    }

    #[tokio::test]
    async fn test_apply_bounces_dry_run() {
        let store = MemoryStore::new(10);
        let bounces = vec![
            Bounce {
                recipient: "a@example.org".to_string(),
                status_code: None,
                diagnostic: None,
                campaign_id: None,
            },
            Bounce {
                recipient: "b@example.org".to_string(),
                status_code: Some("4.4.1".to_string()),
                diagnostic: None,
                campaign_id: None,
            },
        ];

        let outcome = apply_bounces(&store, &TablesConfig::default(), &bounces, true)
            .await
            .unwrap();
        assert!(outcome.dry_run);
        // 與實際執行相同的計數方式
        assert_eq!(outcome.scanned, 2);
        assert_eq!(outcome.skipped, 1);
        assert!(store.updates.lock().unwrap().is_empty());
    }
}
