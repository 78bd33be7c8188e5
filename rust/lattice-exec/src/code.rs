use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use lattice_common::{Digest, Uid, make_digest};
use lattice_policy::{InputPolicy, OutputPolicy};
use tokio::sync::RwLock;

use crate::LatticeExecError;

/// A registered, hashable unit of executable logic.
///
/// The digest fingerprints the source so that re-submissions of the same
/// code resolve to the same registration. The attached policies are supplied
/// by the registering service; approval state lives with the external
/// [`ApprovalProvider`].
///
/// [`ApprovalProvider`]: lattice_policy::ApprovalProvider
#[derive(Clone)]
pub struct CodeItem {
    /// The identifier under which the code item is registered
    pub id: Uid,
    /// The human-facing name of the code item
    pub name: String,
    /// The BLAKE3 digest of the code item's name and source
    pub digest: Digest,
    /// The parameter names the code item declares
    pub parameters: BTreeSet<String>,
    /// The input policy consulted when no cached result can be served
    pub input_policy: Option<Arc<dyn InputPolicy>>,
    /// The output policy governing fresh execution
    pub output_policy: Option<Arc<dyn OutputPolicy>>,
}

impl CodeItem {
    /// Register-ready code item over the given name, source text and
    /// declared parameter names
    pub fn new<Name, Parameters, Parameter>(name: Name, source: &str, parameters: Parameters) -> Self
    where
        Name: Into<String>,
        Parameters: IntoIterator<Item = Parameter>,
        Parameter: Into<String>,
    {
        let name = name.into();
        let digest = make_digest(format!("{name}\n{source}"));

        Self {
            id: Uid::new(),
            name,
            digest,
            parameters: parameters.into_iter().map(Into::into).collect(),
            input_policy: None,
            output_policy: None,
        }
    }

    /// Attach an input policy
    pub fn with_input_policy(mut self, policy: Arc<dyn InputPolicy>) -> Self {
        self.input_policy = Some(policy);
        self
    }

    /// Attach an output policy
    pub fn with_output_policy(mut self, policy: Arc<dyn OutputPolicy>) -> Self {
        self.output_policy = Some(policy);
        self
    }
}

impl std::fmt::Debug for CodeItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeItem")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("input_policy", &self.input_policy.as_ref().map(|_| "<policy>"))
            .field("output_policy", &self.output_policy.as_ref().map(|_| "<policy>"))
            .finish()
    }
}

struct RegistryInner {
    by_id: HashMap<Uid, CodeItem>,
    by_digest: HashMap<Digest, Uid>,
}

/// The shared registry of code items known to the authorizer
#[derive(Clone)]
pub struct CodeRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl Default for CodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CodeRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner {
                by_id: HashMap::new(),
                by_digest: HashMap::new(),
            })),
        }
    }

    /// Register a code item, refusing duplicates of an already-registered
    /// digest
    pub async fn register(&self, code: CodeItem) -> Result<Uid, LatticeExecError> {
        let mut inner = self.inner.write().await;

        if inner.by_digest.contains_key(&code.digest) {
            return Err(LatticeExecError::DuplicateCode);
        }

        let id = code.id;
        inner.by_digest.insert(code.digest, id);
        inner.by_id.insert(id, code);

        Ok(id)
    }

    /// Register a code item, or resolve the existing registration that
    /// shares its digest
    pub async fn register_or_existing(&self, code: CodeItem) -> CodeItem {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner
            .by_digest
            .get(&code.digest)
            .and_then(|id| inner.by_id.get(id))
        {
            return existing.clone();
        }

        inner.by_digest.insert(code.digest, code.id);
        inner.by_id.insert(code.id, code.clone());

        code
    }

    /// The code item registered under the given identifier
    pub async fn resolve(&self, id: &Uid) -> Option<CodeItem> {
        let inner = self.inner.read().await;
        inner.by_id.get(id).cloned()
    }

    /// Remove a registration, returning the removed code item
    pub async fn remove(&self, id: &Uid) -> Option<CodeItem> {
        let mut inner = self.inner.write().await;

        let code = inner.by_id.remove(id)?;
        inner.by_digest.remove(&code.digest);

        Some(code)
    }
}
