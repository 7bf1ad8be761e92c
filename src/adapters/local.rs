use crate::domain::model::{ObjectEntry, Page};
use crate::domain::ports::ObjectStore;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// 本機目錄作為物件存儲，key 為相對路徑
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn collect(&self, dir: &Path, entries: &mut Vec<ObjectEntry>) -> Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let metadata = entry.metadata()?;
            if metadata.is_dir() {
                self.collect(&path, entries)?;
                continue;
            }

            let relative = path.strip_prefix(&self.base_path).unwrap_or(&path);
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            entries.push(ObjectEntry {
                key,
                size: metadata.len() as i64,
                last_modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    async fn list_page(
        &self,
        prefix: Option<&str>,
        _token: Option<String>,
    ) -> Result<Page<ObjectEntry, String>> {
        let mut entries = Vec::new();
        if self.base_path.exists() {
            self.collect(&self.base_path, &mut entries)?;
        }
        entries.retain(|e| prefix.map(|p| e.key.starts_with(p)).unwrap_or(true));
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(Page::last(entries))
    }

    async fn read_object(&self, key: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.base_path.join(key))?)
    }

    async fn write_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.base_path.join(key);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        fs::remove_file(self.base_path.join(key))?;
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        self.base_path.join(key).display().to_string()
    }
}
