use crate::domain::model::{
    ApiResource, ApiSummary, CodeSource, FieldChange, Filter, FunctionSummary,
    IntegrationSummary, InvokeOutcome, LogEvent, ObjectEntry, Page, RawMessage, Record,
    StageSummary, UserSummary,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Key-value collections (campaigns, recipients, contacts).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn scan_page(
        &self,
        table: &str,
        filter: Option<&Filter>,
        start_key: Option<Record>,
    ) -> Result<Page<Record, Record>>;
    async fn get_item(&self, table: &str, key: Record) -> Result<Option<Record>>;
    async fn put_item(&self, table: &str, item: Record) -> Result<()>;
    async fn update_item(&self, table: &str, key: Record, changes: Vec<FieldChange>) -> Result<()>;
    async fn delete_item(&self, table: &str, key: Record) -> Result<()>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_page(
        &self,
        prefix: Option<&str>,
        token: Option<String>,
    ) -> Result<Page<ObjectEntry, String>>;
    async fn read_object(&self, key: &str) -> Result<Vec<u8>>;
    async fn write_object(&self, key: &str, data: &[u8]) -> Result<()>;
    async fn delete_object(&self, key: &str) -> Result<()>;
    /// 人類可讀的位置，例如 `s3://bucket/key`
    fn location(&self, key: &str) -> String;
}

#[async_trait]
pub trait FunctionAdmin: Send + Sync {
    async fn list_functions_page(
        &self,
        marker: Option<String>,
    ) -> Result<Page<FunctionSummary, String>>;
    async fn get_function(&self, name: &str) -> Result<FunctionSummary>;
    async fn update_code(&self, name: &str, code: CodeSource) -> Result<FunctionSummary>;
    async fn invoke(&self, name: &str, payload: Vec<u8>) -> Result<InvokeOutcome>;
}

#[async_trait]
pub trait GatewayAdmin: Send + Sync {
    async fn list_apis_page(&self, position: Option<String>) -> Result<Page<ApiSummary, String>>;
    async fn list_resources_page(
        &self,
        api_id: &str,
        position: Option<String>,
    ) -> Result<Page<ApiResource, String>>;
    async fn list_stages(&self, api_id: &str) -> Result<Vec<StageSummary>>;
    async fn get_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
    ) -> Result<IntegrationSummary>;
}

#[async_trait]
pub trait LogSource: Send + Sync {
    async fn filter_page(
        &self,
        group: &str,
        start_ms: i64,
        pattern: Option<&str>,
        token: Option<String>,
    ) -> Result<Page<LogEvent, String>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_users_page(
        &self,
        pool_id: &str,
        token: Option<String>,
    ) -> Result<Page<UserSummary, String>>;
}

#[async_trait]
pub trait Mailbox: Send + Sync {
    async fn fetch_messages(
        &self,
        folder: &str,
        since: Option<NaiveDate>,
    ) -> Result<Vec<RawMessage>>;
}
