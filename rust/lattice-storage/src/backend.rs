use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::Mutex;

use crate::LatticeStorageError;

/// A [`StorageBackend`] is a facade over some generalized storage substrate
/// that is capable of storing, retrieving and removing values by some key.
/// Each operation is atomic with respect to its key; no coordination across
/// keys is offered or required.
#[async_trait]
pub trait StorageBackend: Clone {
    /// The key type used by this [`StorageBackend`]
    type Key: Send + Sync;
    /// The value type able to be stored by this [`StorageBackend`]
    type Value: Send;
    /// The error type produced by this [`StorageBackend`]
    type Error: Into<LatticeStorageError>;

    /// Store the given value against the given key
    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error>;

    /// Retrieve a value (if any) stored against the given key
    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error>;

    /// Remove the value (if any) stored against the given key, returning it
    async fn remove(&mut self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error>;

    /// True if a value is stored against the given key
    async fn contains(&self, key: &Self::Key) -> Result<bool, Self::Error> {
        Ok(self.get(key).await?.is_some())
    }
}

/// A [`StorageSource`] is a [`StorageBackend`] whose entries can be read out
/// lazily as a [`Stream`], in unspecified order
pub trait StorageSource: StorageBackend {
    /// Read out all entries held by this backend
    fn read(
        &self,
    ) -> impl Stream<
        Item = Result<
            (
                <Self as StorageBackend>::Key,
                <Self as StorageBackend>::Value,
            ),
            <Self as StorageBackend>::Error,
        >,
    > + Send;
}

#[async_trait]
impl<T> StorageBackend for Arc<Mutex<T>>
where
    T: StorageBackend + Send + Sync,
{
    type Key = T::Key;
    type Value = T::Value;
    type Error = T::Error;

    async fn set(&mut self, key: Self::Key, value: Self::Value) -> Result<(), Self::Error> {
        let mut inner = self.lock().await;
        inner.set(key, value).await
    }

    async fn get(&self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error> {
        let inner = self.lock().await;
        inner.get(key).await
    }

    async fn remove(&mut self, key: &Self::Key) -> Result<Option<Self::Value>, Self::Error> {
        let mut inner = self.lock().await;
        inner.remove(key).await
    }
}
