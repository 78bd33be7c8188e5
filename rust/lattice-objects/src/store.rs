use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use futures_util::TryStreamExt;
use lattice_common::{Credential, Uid};
use lattice_storage::{MemoryStorageBackend, StorageBackend, StorageSource};
use tokio::sync::RwLock;

use crate::{
    Grant, GrantSet, LatticeObjectsError, MemberId, ObjectPointer, Payload, Permission,
    PointerTarget, RoleDirectory, StoragePermissionRegistry, StoredObject, error::from_backend,
};

/// Options governing a [`CapabilityStore::set`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetOptions {
    /// Grant the writer read access to the written object instead of the
    /// default write/execute pair. Used when a result is handed back to the
    /// caller that requested it.
    pub grant_read_to_writer: bool,
    /// Record a replica location for the local federation member alongside
    /// the write
    pub add_storage_permission: bool,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            grant_read_to_writer: false,
            add_storage_permission: true,
        }
    }
}

/// The value and grant partitions guarded by the store lock
struct Partitions<Data, Grants> {
    data: Data,
    grants: Grants,
}

/// The capability-gated object store.
///
/// Values are addressed by [`Uid`] and guarded by per-identifier
/// [`GrantSet`]s. Every check is default-deny: absent a grant (or root or an
/// elevated role) the answer is no, not an error. Mutations of an
/// identifier's value or grant set are serialized behind one store-wide
/// lock; the ownership claim in [`CapabilityStore::take_ownership`] holds
/// the write half across its check-then-grant so that exactly one of any
/// racing claimants can win.
///
/// The store is generic over the backends holding each partition, which need
/// only satisfy the per-key [`StorageBackend`] contract.
#[derive(Clone)]
pub struct CapabilityStore<Data, Grants, Locations>
where
    Data: StorageBackend<Key = Uid, Value = StoredObject> + Sync,
    Grants: StorageBackend<Key = Uid, Value = GrantSet> + Sync,
    Locations: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    member: MemberId,
    root: Credential,
    roles: Option<Arc<dyn RoleDirectory>>,
    partitions: Arc<RwLock<Partitions<Data, Grants>>>,
    registry: StoragePermissionRegistry<Locations>,
}

/// A [`CapabilityStore`] with every partition held in memory
pub type MemoryCapabilityStore = CapabilityStore<
    MemoryStorageBackend<Uid, StoredObject>,
    MemoryStorageBackend<Uid, GrantSet>,
    MemoryStorageBackend<Uid, BTreeSet<MemberId>>,
>;

impl MemoryCapabilityStore {
    /// Construct a store over in-memory partitions
    pub fn in_memory(member: MemberId, root: Credential) -> Self {
        Self::new(
            member,
            root,
            MemoryStorageBackend::default(),
            MemoryStorageBackend::default(),
            MemoryStorageBackend::default(),
        )
    }
}

impl<Data, Grants, Locations> CapabilityStore<Data, Grants, Locations>
where
    Data: StorageBackend<Key = Uid, Value = StoredObject> + Sync,
    Grants: StorageBackend<Key = Uid, Value = GrantSet> + Sync,
    Locations: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    /// Construct a store for the given federation member, rooted at the
    /// given credential, over the given backend partitions
    pub fn new(
        member: MemberId,
        root: Credential,
        data: Data,
        grants: Grants,
        locations: Locations,
    ) -> Self {
        Self {
            member,
            root,
            roles: None,
            partitions: Arc::new(RwLock::new(Partitions { data, grants })),
            registry: StoragePermissionRegistry::new(member, locations),
        }
    }

    /// Attach a role directory, enabling blanket authorization for elevated
    /// roles
    pub fn with_role_directory(mut self, directory: Arc<dyn RoleDirectory>) -> Self {
        self.roles = Some(directory);
        self
    }

    /// The local federation member this store runs on
    pub fn member(&self) -> MemberId {
        self.member
    }

    /// The root credential, implicitly authorized for everything
    pub fn root(&self) -> &Credential {
        &self.root
    }

    /// The replica registry attached to this store
    pub fn registry(&self) -> &StoragePermissionRegistry<Locations> {
        &self.registry
    }

    /// Retrieve the object at the given identifier. Requires
    /// [`Permission::Read`]; lineage identifiers resolve to their base
    /// identifier first.
    pub async fn get(
        &self,
        id: impl Into<Uid>,
        credential: &Credential,
    ) -> Result<StoredObject, LatticeObjectsError> {
        let uid = id.into();
        let partitions = self.partitions.read().await;

        if !self
            .is_authorized_in(&partitions.grants, credential, uid, Permission::Read)
            .await?
        {
            return Err(LatticeObjectsError::PermissionDenied {
                uid,
                permission: Permission::Read,
                credential: *credential,
            });
        }

        partitions
            .data
            .get(&uid)
            .await
            .map_err(from_backend)?
            .ok_or(LatticeObjectsError::NotFound(uid))
    }

    /// Retrieve the object at the given identifier without a permission
    /// check. For internal trusted callers only; the service surface always
    /// goes through [`CapabilityStore::get`].
    pub async fn get_trusted(
        &self,
        id: impl Into<Uid>,
    ) -> Result<StoredObject, LatticeObjectsError> {
        let uid = id.into();
        let partitions = self.partitions.read().await;

        partitions
            .data
            .get(&uid)
            .await
            .map_err(from_backend)?
            .ok_or(LatticeObjectsError::NotFound(uid))
    }

    /// Retrieve the mock half of the twin at the given identifier. Mocks are
    /// non-sensitive by definition, so no grant is required.
    pub async fn get_mock(&self, id: impl Into<Uid>) -> Result<Payload, LatticeObjectsError> {
        let uid = id.into();
        let partitions = self.partitions.read().await;

        let object = partitions
            .data
            .get(&uid)
            .await
            .map_err(from_backend)?
            .ok_or(LatticeObjectsError::NotFound(uid))?;

        match object {
            StoredObject::Twin { mock, .. } if !mock.is_empty() => Ok(mock),
            _ => Err(LatticeObjectsError::MockUnavailable(uid)),
        }
    }

    /// Produce a pointer to the object at the given identifier, graded by
    /// what the caller may see: private for readers, the mock for twins, and
    /// an empty placeholder otherwise. Fails only when the identifier does
    /// not exist.
    pub async fn get_pointer(
        &self,
        id: impl Into<Uid>,
        credential: &Credential,
        location: MemberId,
    ) -> Result<ObjectPointer, LatticeObjectsError> {
        let uid = id.into();
        let partitions = self.partitions.read().await;

        let object = partitions
            .data
            .get(&uid)
            .await
            .map_err(from_backend)?
            .ok_or(LatticeObjectsError::NotFound(uid))?;

        if self
            .is_authorized_in(&partitions.grants, credential, uid, Permission::Read)
            .await?
        {
            return Ok(ObjectPointer::new(
                uid,
                location,
                PointerTarget::Private,
                object.kind(),
            ));
        }

        if let StoredObject::Twin { mock, .. } = &object {
            if !mock.is_empty() {
                return Ok(ObjectPointer::new(
                    uid,
                    location,
                    PointerTarget::Mock,
                    mock.kind(),
                ));
            }
        }

        Ok(ObjectPointer::new(
            uid,
            location,
            PointerTarget::Empty,
            object.kind(),
        ))
    }

    /// True if a value is stored at the given identifier
    pub async fn exists(&self, id: impl Into<Uid>) -> Result<bool, LatticeObjectsError> {
        let uid = id.into();
        let partitions = self.partitions.read().await;

        partitions.data.contains(&uid).await.map_err(from_backend)
    }

    /// Write an object at the given identifier.
    ///
    /// An unclaimed identifier is claimed first: the caller becomes its
    /// owner, whether the claim is made by the system on the caller's behalf
    /// (the default) or because the caller asked to retain read access via
    /// [`SetOptions::grant_read_to_writer`]. A claimed identifier requires
    /// [`Permission::Write`]. On success the writer is granted write and
    /// execute access, or read access alone under the read-retaining mode.
    pub async fn set(
        &self,
        id: impl Into<Uid>,
        credential: &Credential,
        object: StoredObject,
        options: SetOptions,
    ) -> Result<(), LatticeObjectsError> {
        let uid = id.into();

        {
            let mut partitions = self.partitions.write().await;

            let mut can_write = self
                .is_authorized_in(&partitions.grants, credential, uid, Permission::Write)
                .await?;

            let present = partitions.data.contains(&uid).await.map_err(from_backend)?;
            if !present
                && Self::claim_in(&mut partitions, uid, credential, vec![Permission::Owner])
                    .await
                    .is_ok()
            {
                can_write = true;
            }

            if !can_write {
                return Err(LatticeObjectsError::PermissionDenied {
                    uid,
                    permission: Permission::Write,
                    credential: *credential,
                });
            }

            partitions.data.set(uid, object).await.map_err(from_backend)?;

            if partitions
                .grants
                .get(&uid)
                .await
                .map_err(from_backend)?
                .is_none()
            {
                partitions
                    .grants
                    .set(uid, GrantSet::default())
                    .await
                    .map_err(from_backend)?;
            }

            let writer_grants = if options.grant_read_to_writer {
                vec![Grant::read(uid, *credential)]
            } else {
                vec![
                    Grant::write(uid, *credential),
                    Grant::execute(uid, *credential),
                ]
            };
            Self::insert_grants_in(&mut partitions.grants, writer_grants).await?;
        }

        if options.add_storage_permission {
            self.registry.add(uid, self.member).await?;
        }

        Ok(())
    }

    /// Claim an unclaimed identifier, granting the claimant ownership along
    /// with read, write and execute access, atomically. Exactly one claim
    /// can ever succeed for a given identifier; all later attempts observe
    /// [`LatticeObjectsError::AlreadyOwned`].
    pub async fn take_ownership(
        &self,
        id: impl Into<Uid>,
        credential: &Credential,
    ) -> Result<(), LatticeObjectsError> {
        let uid = id.into();
        let mut partitions = self.partitions.write().await;

        Self::claim_in(
            &mut partitions,
            uid,
            credential,
            vec![
                Permission::Owner,
                Permission::Write,
                Permission::Read,
                Permission::Execute,
            ],
        )
        .await
    }

    /// Delete the object and grant set at the given identifier. Requires
    /// [`Permission::Owner`]. Replica records in the storage permission
    /// registry are intentionally left in place; reconciling them belongs to
    /// the federation sync layer.
    pub async fn delete(
        &self,
        id: impl Into<Uid>,
        credential: &Credential,
    ) -> Result<(), LatticeObjectsError> {
        let uid = id.into();
        let mut partitions = self.partitions.write().await;

        if !self
            .is_authorized_in(&partitions.grants, credential, uid, Permission::Owner)
            .await?
        {
            return Err(LatticeObjectsError::PermissionDenied {
                uid,
                permission: Permission::Owner,
                credential: *credential,
            });
        }

        partitions.data.remove(&uid).await.map_err(from_backend)?;
        partitions.grants.remove(&uid).await.map_err(from_backend)?;

        Ok(())
    }

    /// True if the credential may act on the identifier with the given
    /// permission: root and blanket roles are always authorized, otherwise
    /// an explicit grant must exist. Default-deny; absence is `false`, not
    /// an error.
    pub async fn has_permission(
        &self,
        credential: &Credential,
        id: impl Into<Uid>,
        permission: Permission,
    ) -> Result<bool, LatticeObjectsError> {
        let uid = id.into();
        let partitions = self.partitions.read().await;

        self.is_authorized_in(&partitions.grants, credential, uid, permission)
            .await
    }

    /// True if every one of the given grants would be honored
    pub async fn has_permissions(&self, grants: &[Grant]) -> Result<bool, LatticeObjectsError> {
        let partitions = self.partitions.read().await;

        for grant in grants {
            if !self
                .is_authorized_in(&partitions.grants, &grant.credential, grant.uid, grant.permission)
                .await?
            {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Add a single permission grant
    pub async fn add_permission(&self, grant: Grant) -> Result<(), LatticeObjectsError> {
        self.add_permissions(vec![grant]).await
    }

    /// Add a batch of permission grants
    pub async fn add_permissions(&self, grants: Vec<Grant>) -> Result<(), LatticeObjectsError> {
        let mut partitions = self.partitions.write().await;

        Self::insert_grants_in(&mut partitions.grants, grants).await
    }

    /// Remove a permission grant, if present
    pub async fn remove_permission(&self, grant: Grant) -> Result<(), LatticeObjectsError> {
        let mut partitions = self.partitions.write().await;

        if let Some(mut set) = partitions
            .grants
            .get(&grant.uid)
            .await
            .map_err(from_backend)?
        {
            set.remove(&grant.entry());
            partitions
                .grants
                .set(grant.uid, set)
                .await
                .map_err(from_backend)?;
        }

        Ok(())
    }

    /// The grant set attached to the given identifier; empty when none has
    /// been created
    pub async fn permissions_of(
        &self,
        id: impl Into<Uid>,
    ) -> Result<GrantSet, LatticeObjectsError> {
        let uid = id.into();
        let partitions = self.partitions.read().await;

        Ok(partitions
            .grants
            .get(&uid)
            .await
            .map_err(from_backend)?
            .unwrap_or_default())
    }

    /// Record that the given member holds a replica of the object
    pub async fn add_storage_permission(
        &self,
        id: impl Into<Uid>,
        member: MemberId,
    ) -> Result<(), LatticeObjectsError> {
        self.registry.add(id, member).await
    }

    /// Remove the record of the given member holding a replica
    pub async fn remove_storage_permission(
        &self,
        id: impl Into<Uid>,
        member: MemberId,
    ) -> Result<(), LatticeObjectsError> {
        self.registry.remove(id, member).await
    }

    /// True if the given member holds a replica of the object
    pub async fn has_storage_permission(
        &self,
        id: impl Into<Uid>,
        member: MemberId,
    ) -> Result<bool, LatticeObjectsError> {
        self.registry.has(id, member).await
    }

    /// Whether the credential is authorized, first by identity, then by
    /// role, then by explicit grant
    async fn is_authorized_in(
        &self,
        grants: &Grants,
        credential: &Credential,
        uid: Uid,
        permission: Permission,
    ) -> Result<bool, LatticeObjectsError> {
        if credential == &self.root {
            return Ok(true);
        }

        if let Some(directory) = &self.roles {
            if directory.role_of(credential).await.bypasses_grants() {
                return Ok(true);
            }
        }

        let set = grants.get(&uid).await.map_err(from_backend)?;

        Ok(set
            .map(|set| set.contains(&(permission, *credential)))
            .unwrap_or(false))
    }

    /// Grant the claimant the given permissions over an identifier that has
    /// neither a grant set nor a value. Callers must hold the write guard.
    async fn claim_in(
        partitions: &mut Partitions<Data, Grants>,
        uid: Uid,
        credential: &Credential,
        permissions: Vec<Permission>,
    ) -> Result<(), LatticeObjectsError> {
        let owned = partitions.grants.contains(&uid).await.map_err(from_backend)?
            || partitions.data.contains(&uid).await.map_err(from_backend)?;

        if owned {
            return Err(LatticeObjectsError::AlreadyOwned(uid));
        }

        Self::insert_grants_in(
            &mut partitions.grants,
            permissions
                .into_iter()
                .map(|permission| Grant::new(uid, permission, *credential))
                .collect(),
        )
        .await
    }

    async fn insert_grants_in(
        backend: &mut Grants,
        grants: Vec<Grant>,
    ) -> Result<(), LatticeObjectsError> {
        for grant in grants {
            let mut set = backend
                .get(&grant.uid)
                .await
                .map_err(from_backend)?
                .unwrap_or_default();
            set.insert(grant.entry());
            backend.set(grant.uid, set).await.map_err(from_backend)?;
        }

        Ok(())
    }
}

impl<Data, Grants, Locations> CapabilityStore<Data, Grants, Locations>
where
    Data: StorageBackend<Key = Uid, Value = StoredObject> + Sync,
    Grants: StorageBackend<Key = Uid, Value = GrantSet> + StorageSource + Sync,
    Locations: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    /// Every grant set held by the store, keyed by identifier
    pub async fn get_all_permissions(
        &self,
    ) -> Result<BTreeMap<Uid, GrantSet>, LatticeObjectsError> {
        let partitions = self.partitions.read().await;

        partitions.grants.read().try_collect().await.map_err(from_backend)
    }
}

impl<Data, Grants, Locations> CapabilityStore<Data, Grants, Locations>
where
    Data: StorageBackend<Key = Uid, Value = StoredObject> + StorageSource + Sync,
    Grants: StorageBackend<Key = Uid, Value = GrantSet> + Sync,
    Locations: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    /// Every stored object the given credential may read
    pub async fn all_readable(
        &self,
        credential: &Credential,
    ) -> Result<Vec<(Uid, StoredObject)>, LatticeObjectsError> {
        let entries: Vec<(Uid, StoredObject)> = {
            let partitions = self.partitions.read().await;
            partitions.data.read().try_collect().await.map_err(from_backend)?
        };

        let mut readable = Vec::new();
        for (uid, object) in entries {
            if self
                .has_permission(credential, uid, Permission::Read)
                .await?
            {
                readable.push((uid, object));
            }
        }

        Ok(readable)
    }
}

impl<Data, Grants, Locations> CapabilityStore<Data, Grants, Locations>
where
    Data: StorageBackend<Key = Uid, Value = StoredObject> + Sync,
    Grants: StorageBackend<Key = Uid, Value = GrantSet> + Sync,
    Locations: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>> + StorageSource,
{
    /// Every replica record held by the registry, keyed by identifier
    pub async fn get_all_storage_permissions(
        &self,
    ) -> Result<BTreeMap<Uid, BTreeSet<MemberId>>, LatticeObjectsError> {
        self.registry.all().await
    }
}
