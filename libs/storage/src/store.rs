use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use opendal::{EntryMode, Operator};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// Object store the publishing pipeline writes into.
///
/// Implementations must accept concurrent calls; every call is independent
/// and a returned `Ok` means the object is readable at `key` afterwards.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the whole content of `file` to `key`. The file handle is
    /// consumed and closed before returning. Exceeding `timeout` is an error.
    async fn put(&self, file: File, key: &str, timeout: Duration) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every object below `prefix`, returning how many were removed
    async fn delete_dir(&self, prefix: &str) -> Result<usize>;

    /// Keys of all objects below `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Clone, Debug)]
pub struct OpendalStore {
    op: Operator,
}

impl OpendalStore {
    pub fn new(op: Operator) -> Self {
        Self { op }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }
}

fn dir_prefix(prefix: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        "/".to_string()
    } else {
        format!("{prefix}/")
    }
}

#[async_trait]
impl ObjectStore for OpendalStore {
    async fn put(&self, mut file: File, key: &str, timeout: Duration) -> Result<()> {
        let upload = async {
            let len = file.metadata().await.map(|m| m.len() as usize).unwrap_or(0);
            let mut buf = Vec::with_capacity(len);
            file.read_to_end(&mut buf).await?;
            drop(file);
            let size = buf.len();
            self.op.write(key, buf).await?;
            tracing::trace!(key, size, "object written");
            anyhow::Ok(())
        };
        match tokio::time::timeout(timeout, upload).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("upload of {} timed out after {:?}", key, timeout)),
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.op.read(key).await?.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.op.delete(key).await?;
        Ok(())
    }

    async fn delete_dir(&self, prefix: &str) -> Result<usize> {
        let keys = self.list(prefix).await?;
        for key in keys.iter() {
            self.op.delete(key).await?;
        }
        tracing::info!("Deleted {} objects below {}", keys.len(), prefix);
        Ok(keys.len())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let entries = self
            .op
            .list_with(&dir_prefix(prefix))
            .recursive(true)
            .await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.metadata().mode() == EntryMode::FILE)
            .map(|entry| entry.path().to_string())
            .collect())
    }
}
