use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use lattice_common::{Credential, Role, Uid};
use lattice_objects::{
    CapabilityStore, GrantSet, MemberId, Permission, RoleDirectory, SetOptions, StoredObject,
};
use lattice_policy::{
    ApprovalProvider, ArgumentMap, ExecutionRecord, OutputHistory, PolicyContext, Verdict,
};
use lattice_storage::{MemoryStorageBackend, StorageBackend};
use tracing::{debug, warn};

use crate::{
    CachedResult, CallOutcome, CodeItem, CodeRegistry, ComputeBackend, LatticeExecError,
    resolve_visibility,
};

/// Options governing a single [`Authorizer::call`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Store the result under this identifier instead of a fresh one
    pub result_id: Option<Uid>,
    /// Hand the caller read access to the result instead of the default
    /// write/execute pair
    pub grant_read_to_caller: bool,
}

/// The policy-gated, cache-aware execution authorizer.
///
/// A call flows through: code resolution, mock-execution classification,
/// override detection, approval check, output-policy evaluation, cache
/// lookup, fresh execution, result persistence, history append, and finally
/// visibility resolution. Store state is read before the compute suspension
/// point and written after it; no store lock is ever held across it.
#[derive(Clone)]
pub struct Authorizer<Data, Grants, Locations>
where
    Data: StorageBackend<Key = Uid, Value = StoredObject> + Sync,
    Grants: StorageBackend<Key = Uid, Value = GrantSet> + Sync,
    Locations: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    store: CapabilityStore<Data, Grants, Locations>,
    codes: CodeRegistry,
    history: OutputHistory,
    roles: Arc<dyn RoleDirectory>,
    approvals: Arc<dyn ApprovalProvider>,
    compute: Arc<dyn ComputeBackend>,
}

/// An [`Authorizer`] over a [`CapabilityStore`] with in-memory partitions
pub type MemoryAuthorizer = Authorizer<
    MemoryStorageBackend<Uid, StoredObject>,
    MemoryStorageBackend<Uid, GrantSet>,
    MemoryStorageBackend<Uid, BTreeSet<MemberId>>,
>;

impl<Data, Grants, Locations> Authorizer<Data, Grants, Locations>
where
    Data: StorageBackend<Key = Uid, Value = StoredObject> + Sync,
    Grants: StorageBackend<Key = Uid, Value = GrantSet> + Sync,
    Locations: StorageBackend<Key = Uid, Value = BTreeSet<MemberId>>,
{
    /// Construct an authorizer over the given store and external
    /// collaborators, with an empty code registry and output history
    pub fn new(
        store: CapabilityStore<Data, Grants, Locations>,
        roles: Arc<dyn RoleDirectory>,
        approvals: Arc<dyn ApprovalProvider>,
        compute: Arc<dyn ComputeBackend>,
    ) -> Self {
        Self {
            store,
            codes: CodeRegistry::new(),
            history: OutputHistory::new(),
            roles,
            approvals,
            compute,
        }
    }

    /// The capability store this authorizer writes results into
    pub fn store(&self) -> &CapabilityStore<Data, Grants, Locations> {
        &self.store
    }

    /// The registry of code items known to this authorizer
    pub fn codes(&self) -> &CodeRegistry {
        &self.codes
    }

    /// The per-code output history
    pub fn history(&self) -> &OutputHistory {
        &self.history
    }

    /// Call a registered code item.
    ///
    /// `arguments` maps the code's parameter names to resolved object
    /// identifiers; cache equivalence is strict equality of this map. The
    /// returned [`CallOutcome`] distinguishes fresh execution, a historical
    /// result, and unapproved code; every refusal is a typed error.
    pub async fn call(
        &self,
        code_id: Uid,
        credential: &Credential,
        arguments: ArgumentMap,
        options: CallOptions,
    ) -> Result<CallOutcome, LatticeExecError> {
        let code = self
            .codes
            .resolve(&code_id)
            .await
            .ok_or(LatticeExecError::CodeNotFound(code_id))?;
        let role = self.roles.role_of(credential).await;

        // A call over exclusively self-owned arguments is a mock execution
        // and needs an explicit elevation, except for the trivial zero-
        // argument case.
        let owned_arguments = self.count_owned_arguments(credential, &arguments).await?;
        let all_owned = owned_arguments == arguments.len();
        let signature_matches =
            arguments.keys().cloned().collect::<BTreeSet<_>>() == code.parameters;

        let mut elevated_mock = false;
        if all_owned && signature_matches {
            if role == Role::Admin || self.roles.may_execute_mock(credential).await {
                elevated_mock = true;
            } else if !arguments.is_empty() {
                return Err(LatticeExecError::InputMismatch(
                    "Mock execution over self-owned arguments requires mock-execution \
                     permission"
                        .into(),
                ));
            }
        }

        let override_execution = elevated_mock
            || credential == self.store.root()
            || role == Role::Admin
            || self
                .store
                .has_permission(credential, code_id, Permission::Execute)
                .await?;

        if !override_execution {
            let approval = self.approvals.approval_of(&code.id).await;
            if !approval.is_approved() {
                debug!(code = %code.id, "call stopped on unapproved code");
                return Ok(CallOutcome::Unapproved {
                    explanation: approval.explanation(),
                });
            }

            let records = self.history.records_of(&code.id).await;
            let context = PolicyContext {
                code: code.id,
                credential,
                role,
                executions: &records,
            };

            let verdict = match &code.output_policy {
                Some(policy) => policy.evaluate(&context),
                None => Verdict::invalid("Code item has no output policy"),
            };

            if let Some(reason) = verdict.reason() {
                // Historical results stand in for execution when the inputs
                // are identical and none of them needs re-validation.
                if owned_arguments == 0 {
                    if let Some(last) = records.last() {
                        if last.matches(&arguments) {
                            debug!(code = %code.id, "serving cached result");
                            let cached =
                                self.resolve_cached(credential, last, Some(reason)).await?;
                            return Ok(CallOutcome::Cached(cached));
                        }
                    }
                }

                if let Some(policy) = &code.input_policy {
                    policy.validate(&context, &arguments)?;
                }

                warn!(code = %code.id, reason, "call refused by output policy");
                return Err(LatticeExecError::PolicyInvalid(reason.to_string()));
            }
        } else {
            debug!(code = %code.id, "override call; approval, policy and cache skipped");
        }

        self.execute(&code, credential, role, arguments, options, override_execution)
            .await
    }

    /// Append an execution record for a code item out-of-band, for outputs
    /// produced elsewhere. Requires approved code unless the caller is an
    /// administrator.
    pub async fn record_execution(
        &self,
        code_id: Uid,
        credential: &Credential,
        inputs: ArgumentMap,
        outputs: Vec<Uid>,
    ) -> Result<(), LatticeExecError> {
        let code = self
            .codes
            .resolve(&code_id)
            .await
            .ok_or(LatticeExecError::CodeNotFound(code_id))?;

        if self.roles.role_of(credential).await != Role::Admin {
            let approval = self.approvals.approval_of(&code.id).await;
            if !approval.is_approved() {
                return Err(LatticeExecError::PolicyInvalid(approval.explanation()));
            }
        }

        self.history
            .append(code.id, ExecutionRecord::new(inputs, outputs))
            .await;

        Ok(())
    }

    /// Fetch arguments, run the compute backend, persist the result, record
    /// it, and resolve visibility.
    async fn execute(
        &self,
        code: &CodeItem,
        credential: &Credential,
        role: Role,
        arguments: ArgumentMap,
        options: CallOptions,
        override_execution: bool,
    ) -> Result<CallOutcome, LatticeExecError> {
        // Arguments are fetched ahead of the compute call so that no store
        // state is touched while the computation is in flight.
        let mut resolved = BTreeMap::new();
        for (name, uid) in &arguments {
            let object = self.store.get_trusted(*uid).await?;
            resolved.insert(name.clone(), object);
        }

        let result_id = match options.result_id {
            Some(uid) => {
                if self.store.exists(uid).await? {
                    return Err(LatticeExecError::Configuration(format!(
                        "Result identifier {uid} is already in use"
                    )));
                }
                uid
            }
            None => Uid::new(),
        };

        let produced = self
            .compute
            .execute(code, &resolved)
            .await
            .map_err(|error| LatticeExecError::ExecutionFailed(error.to_string()))?;

        self.store
            .set(
                result_id,
                credential,
                produced.clone(),
                SetOptions {
                    grant_read_to_writer: options.grant_read_to_caller,
                    add_storage_permission: true,
                },
            )
            .await
            .map_err(|error| {
                LatticeExecError::ExecutionFailed(format!(
                    "Could not persist result {result_id}: {error}"
                ))
            })?;

        if !override_execution {
            self.history
                .append(
                    code.id,
                    ExecutionRecord::new(arguments.clone(), vec![result_id]),
                )
                .await;

            let records = self.history.records_of(&code.id).await;
            let context = PolicyContext {
                code: code.id,
                credential,
                role,
                executions: &records,
            };
            if let Some(policy) = &code.output_policy {
                policy.on_execution(&context);
            }
            if let Some(policy) = &code.input_policy {
                policy.on_execution(&context);
            }
        }

        let readable = self
            .store
            .has_permission(credential, result_id, Permission::Read)
            .await?;

        debug!(code = %code.id, result = %result_id, "execution persisted");

        Ok(CallOutcome::Executed(resolve_visibility(
            &produced, readable,
        )))
    }

    /// Re-resolve a historical record's outputs through the visibility
    /// rules for the given caller
    async fn resolve_cached(
        &self,
        credential: &Credential,
        record: &ExecutionRecord,
        warning: Option<&str>,
    ) -> Result<CachedResult, LatticeExecError> {
        let mut payloads = Vec::new();

        for uid in &record.outputs {
            let object = self.store.get_trusted(*uid).await?;
            let readable = self
                .store
                .has_permission(credential, *uid, Permission::Read)
                .await?;
            payloads.push(resolve_visibility(&object, readable));
        }

        Ok(CachedResult {
            payloads,
            warning: warning.map(str::to_string),
        })
    }

    /// How many of the supplied arguments carry an explicit owner grant for
    /// the caller. Blanket authorization deliberately does not count here;
    /// classification is about what the caller actually owns.
    async fn count_owned_arguments(
        &self,
        credential: &Credential,
        arguments: &ArgumentMap,
    ) -> Result<usize, LatticeExecError> {
        let mut owned = 0;

        for uid in arguments.values() {
            if self
                .store
                .permissions_of(*uid)
                .await?
                .contains(&(Permission::Owner, *credential))
            {
                owned += 1;
            }
        }

        Ok(owned)
    }
}
