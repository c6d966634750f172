use std::{collections::HashMap, convert::Infallible, sync::Arc};

use super::BlobStore;

/// Process-local store. Clones share the same blobs.
#[derive(Clone, Default)]
pub struct MemoryStore {
    map: Arc<tokio::sync::Mutex<HashMap<String, bytes::Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    pub async fn insert(&self, blob: impl Into<String>, body: impl Into<bytes::Bytes>) {
        self.map.lock().await.insert(blob.into(), body.into());
    }

    pub async fn text(&self, blob: &str) -> Option<String> {
        self.map
            .lock()
            .await
            .get(blob)
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }
}

impl BlobStore for MemoryStore {
    type Error = Infallible;

    async fn get(&self, blob: &str) -> Result<Option<bytes::Bytes>, Self::Error> {
        Ok(self.map.lock().await.get(blob).cloned())
    }

    async fn put(&self, blob: &str, body: bytes::Bytes) -> Result<(), Self::Error> {
        self.map.lock().await.insert(blob.to_owned(), body);
        Ok(())
    }
}
