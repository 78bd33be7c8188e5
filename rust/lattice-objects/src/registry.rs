use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use futures_util::TryStreamExt;
use lattice_common::Uid;
use lattice_storage::{StorageBackend, StorageSource};
use tokio::sync::RwLock;

use crate::{LatticeObjectsError, MemberId, error::from_backend};

/// Tracks which federation members hold a replica of each stored object.
///
/// Storage permissions are bookkeeping for replica placement and pointer
/// resolution. They are wholly independent of access grants: adding or
/// removing a location never requires, confers or revokes any access to the
/// object itself, and mutations here need no coordination with the
/// capability store.
#[derive(Clone)]
pub struct StoragePermissionRegistry<Backend>
where
    Backend: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    member: MemberId,
    locations: Arc<RwLock<Backend>>,
}

impl<Backend> StoragePermissionRegistry<Backend>
where
    Backend: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    /// Construct a registry for the given local federation member over the
    /// given backend
    pub fn new(member: MemberId, backend: Backend) -> Self {
        Self {
            member,
            locations: Arc::new(RwLock::new(backend)),
        }
    }

    /// The local federation member this registry belongs to
    pub fn member(&self) -> MemberId {
        self.member
    }

    /// Record that the given member holds a replica of the object
    pub async fn add(
        &self,
        id: impl Into<Uid>,
        member: MemberId,
    ) -> Result<(), LatticeObjectsError> {
        let uid = id.into();
        let mut locations = self.locations.write().await;
        let mut members = locations
            .get(&uid)
            .await
            .map_err(from_backend)?
            .unwrap_or_default();
        members.insert(member);
        locations.set(uid, members).await.map_err(from_backend)?;

        Ok(())
    }

    /// Remove the record of the given member holding a replica
    pub async fn remove(
        &self,
        id: impl Into<Uid>,
        member: MemberId,
    ) -> Result<(), LatticeObjectsError> {
        let uid = id.into();
        let mut locations = self.locations.write().await;
        if let Some(mut members) = locations.get(&uid).await.map_err(from_backend)? {
            members.remove(&member);
            locations.set(uid, members).await.map_err(from_backend)?;
        }

        Ok(())
    }

    /// True if the given member holds a replica of the object
    pub async fn has(
        &self,
        id: impl Into<Uid>,
        member: MemberId,
    ) -> Result<bool, LatticeObjectsError> {
        let uid = id.into();
        let locations = self.locations.read().await;
        let members = locations.get(&uid).await.map_err(from_backend)?;

        Ok(members
            .map(|members| members.contains(&member))
            .unwrap_or(false))
    }

    /// True if the local member holds a replica of the object
    pub async fn has_local(&self, id: impl Into<Uid>) -> Result<bool, LatticeObjectsError> {
        self.has(id, self.member).await
    }

    /// The set of members holding a replica of the object; empty when the
    /// identifier is unknown to the registry
    pub async fn locations_of(
        &self,
        id: impl Into<Uid>,
    ) -> Result<BTreeSet<MemberId>, LatticeObjectsError> {
        let uid = id.into();
        let locations = self.locations.read().await;

        Ok(locations
            .get(&uid)
            .await
            .map_err(from_backend)?
            .unwrap_or_default())
    }
}

impl<Backend> StoragePermissionRegistry<Backend>
where
    Backend: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>> + StorageSource,
{
    /// Every replica record held by this registry
    pub async fn all(&self) -> Result<BTreeMap<Uid, BTreeSet<MemberId>>, LatticeObjectsError> {
        let locations = self.locations.read().await;

        locations.read().try_collect().await.map_err(from_backend)
    }
}
