//! Blob storage for CSV datasets.
//!
//! A missing blob is not an error at this layer: `get` answers `None` and
//! `load_dataset` turns that into an empty dataset.

use tracing::{debug, error};

use crate::{ErrorContext, codec, record::Dataset};

pub mod memory;
pub mod s3;
pub mod sqlite;

pub trait BlobStore {
    type Error;

    fn get(&self, blob: &str) -> impl Future<Output = Result<Option<bytes::Bytes>, Self::Error>> + Send;

    fn put(&self, blob: &str, body: bytes::Bytes) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

impl<S: BlobStore + Sync> BlobStore for &S {
    type Error = S::Error;

    fn get(&self, blob: &str) -> impl Future<Output = Result<Option<bytes::Bytes>, Self::Error>> + Send {
        (**self).get(blob)
    }

    fn put(&self, blob: &str, body: bytes::Bytes) -> impl Future<Output = Result<(), Self::Error>> + Send {
        (**self).put(blob, body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError<E> {
    #[error("store: {0}")]
    Store(E),
    #[error(transparent)]
    Dataset(crate::Error),
}

pub async fn load_dataset<S: BlobStore>(
    store: &S,
    blob: &str,
) -> Result<Option<Dataset>, StoreError<S::Error>>
where
    S::Error: std::fmt::Display,
{
    let Some(body) = store
        .get(blob)
        .await
        .map_err(StoreError::Store)
        .inspect_err(|error| error!(%error, blob, "failed to fetch blob"))?
    else {
        debug!(blob, "blob is absent");
        return Ok(None);
    };
    let dataset = codec::decode(&ErrorContext::new(blob), &body).map_err(StoreError::Dataset)?;
    debug!(blob, rows = dataset.len(), "loaded dataset");
    Ok(Some(dataset))
}

/// Like [`load_dataset`], with an absent blob read as an empty dataset.
pub async fn load_dataset_or_empty<S: BlobStore>(
    store: &S,
    blob: &str,
) -> Result<Dataset, StoreError<S::Error>>
where
    S::Error: std::fmt::Display,
{
    Ok(load_dataset(store, blob).await?.unwrap_or_default())
}

/// Encodes the whole dataset before writing so a failure never leaves a
/// partial blob behind.
pub async fn save_dataset<S: BlobStore>(
    store: &S,
    blob: &str,
    dataset: &Dataset,
) -> Result<(), StoreError<S::Error>>
where
    S::Error: std::fmt::Display,
{
    let body = codec::encode(&ErrorContext::new(blob), dataset).map_err(StoreError::Dataset)?;
    store
        .put(blob, body.into())
        .await
        .map_err(StoreError::Store)
        .inspect_err(|error| error!(%error, blob, "failed to write blob"))?;
    debug!(blob, rows = dataset.len(), "saved dataset");
    Ok(())
}
