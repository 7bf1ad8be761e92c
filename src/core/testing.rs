//! In-memory fakes of the ports, shared by the unit tests.

use crate::domain::model::{FieldChange, Filter, ObjectEntry, Page, Record};
use crate::domain::ports::{KeyValueStore, ObjectStore};
use crate::utils::error::{OpsError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Record>>>,
    page_size: usize,
    failing: HashSet<String>,
    pub deletes: Mutex<Vec<Record>>,
    pub updates: Mutex<Vec<(Record, Vec<FieldChange>)>>,
}

fn matches_key(item: &Record, key: &Record) -> bool {
    key.data.iter().all(|(k, v)| item.data.get(k) == Some(v))
}

fn failure(operation: &'static str, key: &Record) -> OpsError {
    OpsError::ServiceError {
        service: "dynamodb",
        operation,
        message: format!("throttled on {}", key.describe()),
    }
}

impl MemoryStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn with_items(self, table: &str, items: Vec<Record>) -> Self {
        self.tables
            .lock()
            .unwrap()
            .insert(table.to_string(), items);
        self
    }

    /// Writes touching a key with this description fail.
    pub fn failing_on(mut self, key: &Record) -> Self {
        self.failing.insert(key.describe());
        self
    }

    pub fn items(&self, table: &str) -> Vec<Record> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn scan_page(
        &self,
        table: &str,
        filter: Option<&Filter>,
        start_key: Option<Record>,
    ) -> Result<Page<Record, Record>> {
        let all = self.items(table);
        let offset = start_key
            .and_then(|k| k.data.get("__offset").and_then(|v| v.as_u64()))
            .unwrap_or(0) as usize;
        let end = (offset + self.page_size).min(all.len());

        // 與 DynamoDB 相同：先分頁，再套用過濾條件
        let items = all[offset..end]
            .iter()
            .filter(|item| filter.map(|f| f.matches(item)).unwrap_or(true))
            .cloned()
            .collect();
        let next = (end < all.len()).then(|| Record::new().with("__offset", end as u64));
        Ok(Page { items, next })
    }

    async fn get_item(&self, table: &str, key: Record) -> Result<Option<Record>> {
        Ok(self
            .items(table)
            .into_iter()
            .find(|item| matches_key(item, &key)))
    }

    async fn put_item(&self, table: &str, item: Record) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.entry(table.to_string()).or_default().push(item);
        Ok(())
    }

    async fn update_item(&self, table: &str, key: Record, changes: Vec<FieldChange>) -> Result<()> {
        if self.failing.contains(&key.describe()) {
            return Err(failure("update_item", &key));
        }
        self.updates
            .lock()
            .unwrap()
            .push((key.clone(), changes.clone()));

        let mut tables = self.tables.lock().unwrap();
        let items = tables.entry(table.to_string()).or_default();
        let index = match items.iter().position(|item| matches_key(item, &key)) {
            Some(index) => index,
            None => {
                items.push(key.clone());
                items.len() - 1
            }
        };
        for change in changes {
            match change {
                FieldChange::Set(field, value) => {
                    items[index].data.insert(field, value);
                }
                FieldChange::Remove(field) => {
                    items[index].data.remove(&field);
                }
            }
        }
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: Record) -> Result<()> {
        if self.failing.contains(&key.describe()) {
            return Err(failure("delete_item", &key));
        }
        self.deletes.lock().unwrap().push(key.clone());
        let mut tables = self.tables.lock().unwrap();
        if let Some(items) = tables.get_mut(table) {
            items.retain(|item| !matches_key(item, &key));
        }
        Ok(())
    }
}

/// Object store with a fixed page size and keys that refuse deletion.
#[derive(Default)]
pub struct MemoryObjects {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    page_size: usize,
    undeletable: HashSet<String>,
}

impl MemoryObjects {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn with_object(self, key: &str, data: &[u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        self
    }

    pub fn undeletable(mut self, key: &str) -> Self {
        self.undeletable.insert(key.to_string());
        self
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjects {
    async fn list_page(
        &self,
        prefix: Option<&str>,
        token: Option<String>,
    ) -> Result<Page<ObjectEntry, String>> {
        let matching: Vec<ObjectEntry> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| prefix.map(|p| k.starts_with(p)).unwrap_or(true))
            .map(|(k, v)| ObjectEntry {
                key: k.clone(),
                size: v.len() as i64,
                last_modified: None,
            })
            .collect();
        let offset: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + self.page_size).min(matching.len());
        let next = (end < matching.len()).then(|| end.to_string());
        Ok(Page {
            items: matching[offset..end].to_vec(),
            next,
        })
    }

    async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| OpsError::not_found(key))
    }

    async fn write_object(&self, key: &str, data: &[u8]) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        if self.undeletable.contains(key) {
            return Err(OpsError::ServiceError {
                service: "s3",
                operation: "delete_object",
                message: "AccessDenied".to_string(),
            });
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}
