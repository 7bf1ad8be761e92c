pub mod bounces;
pub mod campaigns;
pub mod contacts;
pub mod deploy;
pub mod functions;
pub mod gateway;
pub mod logs;
pub mod objects;
pub mod report;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{Page, Record};
pub use crate::domain::ports::{
    FunctionAdmin, GatewayAdmin, KeyValueStore, LogSource, Mailbox, ObjectStore, UserDirectory,
};
pub use crate::utils::error::Result;

use crate::config::TableConfig;
use crate::utils::error::OpsError;
use std::future::Future;

/// Follows page cursors until the listing is exhausted or `limit` items are collected.
pub async fn collect_pages<T, C, F, Fut>(limit: Option<usize>, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<C>) -> Fut,
    Fut: Future<Output = Result<Page<T, C>>>,
{
    let mut items = Vec::new();
    let mut cursor = None;
    let mut pages = 0usize;

    loop {
        let page = fetch(cursor.take()).await?;
        pages += 1;
        items.extend(page.items);

        if let Some(limit) = limit {
            if items.len() >= limit {
                items.truncate(limit);
                break;
            }
        }

        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    tracing::debug!("Collected {} items over {} pages", items.len(), pages);
    Ok(items)
}

/// Key record for a table with a single partition key.
pub fn single_key(table: &TableConfig, value: &str) -> Result<Record> {
    match table.key.as_slice() {
        [attribute] => Ok(Record::new().with(attribute, value)),
        _ => Err(OpsError::ConfigError {
            message: format!(
                "table {} has a composite key ({}); a single key value is not enough",
                table.name,
                table.key.join(", ")
            ),
        }),
    }
}

/// Key record for a (partition, sort) table.
pub fn composite_key(table: &TableConfig, partition: &str, sort: &str) -> Result<Record> {
    match table.key.as_slice() {
        [p, s] => Ok(Record::new().with(p, partition).with(s, sort)),
        _ => Err(OpsError::ConfigError {
            message: format!(
                "table {} is expected to have a partition and a sort key, found ({})",
                table.name,
                table.key.join(", ")
            ),
        }),
    }
}

/// The address as given, then lowercased when that differs.
///
/// Addresses written by this tool are lowercase; records created by the
/// sending application may keep the casing the subscriber typed.
pub fn email_variants(email: &str) -> Vec<String> {
    let given = email.trim().to_string();
    let lower = given.to_ascii_lowercase();
    if lower == given {
        vec![given]
    } else {
        vec![given, lower]
    }
}

/// First of `keys` that exists in `table`.
pub async fn find_existing_key<S: KeyValueStore>(
    store: &S,
    table: &str,
    keys: Vec<Record>,
) -> Result<Option<Record>> {
    for key in keys {
        if store.get_item(table, key.clone()).await?.is_some() {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

/// 批次操作結果：失敗不中斷，逐筆記錄
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub scanned: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failures: Vec<(String, String)>,
    pub dry_run: bool,
}

impl BulkOutcome {
    pub fn dry_run(scanned: usize) -> Self {
        Self {
            scanned,
            dry_run: true,
            ..Self::default()
        }
    }

    pub fn record_failure(&mut self, target: String, error: &OpsError) {
        tracing::warn!("❌ {}: {}", target, error);
        self.failures.push((target, error.to_string()));
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
