use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 鍵值存儲中的一筆資料，屬性名稱對應 JSON 值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(field.to_string(), value.into());
        self
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }

    /// Projects the record onto the given key attributes. `None` when any is missing.
    pub fn key_for(&self, key_attributes: &[String]) -> Option<Record> {
        let mut key = Record::new();
        for attribute in key_attributes {
            let value = self.data.get(attribute)?;
            if value.is_null() {
                return None;
            }
            key.data.insert(attribute.clone(), value.clone());
        }
        Some(key)
    }

    /// `email=a@b.com, campaign_id=c1` 形式，用於日誌與報表
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .data
            .iter()
            .map(|(k, v)| match v.as_str() {
                Some(s) => format!("{}={}", k, s),
                None => format!("{}={}", k, v),
            })
            .collect();
        parts.sort();
        parts.join(", ")
    }
}

/// One page of a paginated listing plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct Page<T, C> {
    pub items: Vec<T>,
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Server-side equality filter for scans.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub attribute: String,
    pub value: serde_json::Value,
}

impl Filter {
    pub fn eq(attribute: &str, value: impl Into<serde_json::Value>) -> Self {
        Self {
            attribute: attribute.to_string(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.data.get(&self.attribute) == Some(&self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Set(String, serde_json::Value),
    Remove(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Sending,
    Sent,
    Failed,
    Other(String),
}

impl CampaignStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Sending => "sending",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Failed => "failed",
            CampaignStatus::Other(s) => s,
        }
    }
}

impl From<String> for CampaignStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "draft" => CampaignStatus::Draft,
            "scheduled" => CampaignStatus::Scheduled,
            "sending" => CampaignStatus::Sending,
            "sent" => CampaignStatus::Sent,
            "failed" => CampaignStatus::Failed,
            _ => CampaignStatus::Other(value),
        }
    }
}

impl From<CampaignStatus> for String {
    fn from(value: CampaignStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
    Bounced,
    Other(String),
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Bounced => "bounced",
            DeliveryStatus::Other(s) => s,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DeliveryStatus::Failed | DeliveryStatus::Bounced)
    }
}

impl From<&str> for DeliveryStatus {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "pending" => DeliveryStatus::Pending,
            "sent" | "delivered" => DeliveryStatus::Sent,
            "failed" | "error" => DeliveryStatus::Failed,
            "bounced" => DeliveryStatus::Bounced,
            _ => DeliveryStatus::Other(value.to_string()),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub campaign_id: String,
    pub subject: String,
    pub body: String,
    pub status: CampaignStatus,
    pub created_at: Option<String>,
}

impl Campaign {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            campaign_id: record.get_str("campaign_id")?.to_string(),
            subject: record.get_str("subject").unwrap_or_default().to_string(),
            body: record.get_str("body").unwrap_or_default().to_string(),
            status: CampaignStatus::from(
                record.get_str("status").unwrap_or("draft").to_string(),
            ),
            created_at: record.get_str("created_at").map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recipient {
    pub campaign_id: String,
    pub email: String,
    pub status: DeliveryStatus,
    pub error_message: Option<String>,
}

impl Recipient {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            campaign_id: record.get_str("campaign_id")?.to_string(),
            email: record.get_str("email")?.to_string(),
            status: DeliveryStatus::from(record.get_str("status").unwrap_or("pending")),
            error_message: record
                .get_str("error_message")
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub email: String,
    pub name: Option<String>,
    pub status: Option<String>,
}

impl Contact {
    pub fn from_record(record: &Record) -> Option<Self> {
        Some(Self {
            email: record.get_str("email")?.to_string(),
            name: record.get_str("name").map(str::to_string),
            status: record.get_str("status").map(str::to_string),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionSummary {
    pub name: String,
    pub runtime: Option<String>,
    pub handler: Option<String>,
    pub role: Option<String>,
    pub memory_mb: Option<i32>,
    pub timeout_secs: Option<i32>,
    pub code_size: i64,
    pub code_sha256: Option<String>,
    pub last_modified: Option<String>,
    pub state: Option<String>,
    pub last_update_status: Option<String>,
    pub environment_keys: Vec<String>,
}

/// Where new function code comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CodeSource {
    ZipBytes(Vec<u8>),
    Bucket { bucket: String, key: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOutcome {
    pub status_code: i32,
    pub function_error: Option<String>,
    pub executed_version: Option<String>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResource {
    pub id: String,
    pub path: String,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub name: String,
    pub deployment_id: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationSummary {
    pub integration_type: Option<String>,
    pub http_method: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp_ms: i64,
    pub stream: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub username: String,
    pub email: Option<String>,
    pub status: Option<String>,
    pub enabled: bool,
}

/// A message fetched from the bounce mailbox, unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub uid: Option<u32>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bounce {
    pub recipient: String,
    pub status_code: Option<String>,
    pub diagnostic: Option<String>,
    pub campaign_id: Option<String>,
}

impl Bounce {
    /// 5.x.x 為永久失敗，4.x.x 為暫時性
    pub fn is_permanent(&self) -> bool {
        self.status_code
            .as_deref()
            .map(|code| code.starts_with('5'))
            .unwrap_or(true)
    }
}
