use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use lattice_common::{Credential, Role};

/// The role/identity directory consulted for blanket authorization. The
/// directory itself (accounts, role management) lives outside this layer;
/// the store only ever asks the two questions below.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// The [`Role`] the given credential holds
    async fn role_of(&self, credential: &Credential) -> Role;

    /// Whether the given credential may run registered code over arguments
    /// it owns itself (a mock execution)
    async fn may_execute_mock(&self, credential: &Credential) -> bool {
        let _ = credential;
        false
    }
}

/// A fixed, in-memory [`RoleDirectory`]. Unknown credentials are guests.
#[derive(Debug, Clone, Default)]
pub struct StaticRoleDirectory {
    roles: HashMap<Credential, Role>,
    mock_executors: HashSet<Credential>,
}

impl StaticRoleDirectory {
    /// An empty directory in which every credential is a guest
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to a credential
    pub fn assign(&mut self, credential: Credential, role: Role) {
        self.roles.insert(credential, role);
    }

    /// Permit a credential to perform mock executions
    pub fn allow_mock_execution(&mut self, credential: Credential) {
        self.mock_executors.insert(credential);
    }
}

#[async_trait]
impl RoleDirectory for StaticRoleDirectory {
    async fn role_of(&self, credential: &Credential) -> Role {
        self.roles.get(credential).copied().unwrap_or_default()
    }

    async fn may_execute_mock(&self, credential: &Credential) -> bool {
        self.mock_executors.contains(credential)
    }
}

#[cfg(test)]
mod tests {
    use lattice_common::{Credential, Role};

    use super::{RoleDirectory, StaticRoleDirectory};

    #[tokio::test]
    async fn it_defaults_unknown_credentials_to_guest() {
        let directory = StaticRoleDirectory::new();
        let credential = Credential::from_bytes([1u8; 32]);

        assert_eq!(directory.role_of(&credential).await, Role::Guest);
        assert!(!directory.may_execute_mock(&credential).await);
    }

    #[tokio::test]
    async fn it_reports_assigned_roles() {
        let mut directory = StaticRoleDirectory::new();
        let credential = Credential::from_bytes([2u8; 32]);

        directory.assign(credential, Role::Steward);
        directory.allow_mock_execution(credential);

        assert_eq!(directory.role_of(&credential).await, Role::Steward);
        assert!(directory.may_execute_mock(&credential).await);
    }
}
