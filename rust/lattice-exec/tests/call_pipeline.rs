//! End-to-end tests for the call pipeline: approval gating, policy-driven
//! caching, mock-execution classification, overrides and visibility.

use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Result;
use async_trait::async_trait;
use lattice_common::{Credential, Role, Uid};
use lattice_exec::{
    Authorizer, CallOptions, CallOutcome, CodeItem, ComputeBackend, ComputeError,
    LatticeExecError, MemoryAuthorizer,
};
use lattice_objects::{
    MemberId, MemoryCapabilityStore, Payload, SetOptions, StaticRoleDirectory, StoredObject,
    Value,
};
use lattice_policy::{
    Approval, ArgumentMap, ExactInputs, ExecuteLimit, MemoryApprovals,
};

/// A compute backend that counts invocations and returns a fixed object
#[derive(Clone)]
struct StubBackend {
    calls: Arc<AtomicUsize>,
    output: StoredObject,
}

#[async_trait]
impl ComputeBackend for StubBackend {
    async fn execute(
        &self,
        _code: &CodeItem,
        _arguments: &BTreeMap<String, StoredObject>,
    ) -> Result<StoredObject, ComputeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.output.clone())
    }
}

struct Fixture {
    authorizer: MemoryAuthorizer,
    approvals: MemoryApprovals,
    calls: Arc<AtomicUsize>,
    root: Credential,
}

fn credential(seed: u8) -> Credential {
    Credential::from_bytes([seed; 32])
}

fn fixture(output: StoredObject, directory: StaticRoleDirectory) -> Fixture {
    let root = credential(0xFF);
    let store = MemoryCapabilityStore::in_memory(MemberId::new(), root)
        .with_role_directory(Arc::new(directory.clone()));
    let approvals = MemoryApprovals::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let backend = StubBackend {
        calls: calls.clone(),
        output,
    };

    Fixture {
        authorizer: Authorizer::new(
            store,
            Arc::new(directory),
            Arc::new(approvals.clone()),
            Arc::new(backend),
        ),
        approvals,
        calls,
        root,
    }
}

#[tokio::test]
async fn it_surfaces_pending_approval_without_recording_history() -> Result<()> {
    let Fixture {
        authorizer, calls, ..
    } = fixture(
        StoredObject::plain(Value::UnsignedInt(1)),
        StaticRoleDirectory::new(),
    );
    let guest = credential(1);

    let code_id = authorizer
        .codes()
        .register(CodeItem::new("report", "fn report() { ... }", Vec::<String>::new()))
        .await?;

    let outcome = authorizer
        .call(code_id, &guest, ArgumentMap::new(), CallOptions::default())
        .await?;

    assert_eq!(
        outcome,
        CallOutcome::Unapproved {
            explanation: "Code is waiting for approval".into()
        }
    );
    assert_eq!(authorizer.history().execution_count(&code_id).await, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn it_serves_history_once_the_output_policy_expires() -> Result<()> {
    let Fixture {
        authorizer,
        approvals,
        calls,
        root,
    } = fixture(
        StoredObject::plain(Value::String("mean: 7".into())),
        StaticRoleDirectory::new(),
    );
    let steward = credential(1);
    let analyst = credential(2);

    // The data under analysis belongs to the steward credential
    let frame = Uid::new();
    authorizer
        .store()
        .set(
            frame,
            &steward,
            StoredObject::plain(Value::Bytes(vec![1, 2, 3])),
            SetOptions::default(),
        )
        .await?;

    let code = CodeItem::new("mean", "fn mean(frame) { ... }", ["frame"])
        .with_output_policy(Arc::new(ExecuteLimit::once()));
    let code_id = authorizer.codes().register(code).await?;
    approvals.set(code_id, Approval::approved()).await;

    let mut arguments = ArgumentMap::new();
    arguments.insert("frame".into(), frame);
    let options = CallOptions {
        grant_read_to_caller: true,
        ..CallOptions::default()
    };

    let first = authorizer
        .call(code_id, &analyst, arguments.clone(), options)
        .await?;

    assert_eq!(
        first.executed(),
        Some(&Payload::Data(Value::String("mean: 7".into())))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(authorizer.history().execution_count(&code_id).await, 1);

    // The limit is spent; an identical call is answered from history and
    // the backend is not invoked again
    let second = authorizer
        .call(code_id, &analyst, arguments.clone(), options)
        .await?;

    match &second {
        CallOutcome::Cached(cached) => {
            assert_eq!(
                cached.single(),
                Some(&Payload::Data(Value::String("mean: 7".into())))
            );
            assert!(cached.warning.as_ref().unwrap().contains("limit of 1"));
        }
        other => panic!("expected a cached result, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(authorizer.history().execution_count(&code_id).await, 1);

    // Different arguments no longer match the fingerprint; with no input
    // policy attached the caller gets the policy's explanation instead
    let unrelated = Uid::new();
    authorizer
        .store()
        .set(
            unrelated,
            &root,
            StoredObject::plain(Value::Bytes(vec![9])),
            SetOptions::default(),
        )
        .await?;
    let mut altered = ArgumentMap::new();
    altered.insert("frame".into(), unrelated);

    let refused = authorizer.call(code_id, &analyst, altered, options).await;

    assert!(matches!(refused, Err(LatticeExecError::PolicyInvalid(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    Ok(())
}

#[tokio::test]
async fn it_validates_inputs_when_the_fingerprint_diverges() -> Result<()> {
    let Fixture {
        authorizer,
        approvals,
        ..
    } = fixture(
        StoredObject::plain(Value::UnsignedInt(1)),
        StaticRoleDirectory::new(),
    );
    let steward = credential(1);
    let analyst = credential(2);

    let frame = Uid::new();
    authorizer
        .store()
        .set(
            frame,
            &steward,
            StoredObject::plain(Value::Bytes(vec![1])),
            SetOptions::default(),
        )
        .await?;

    let mut allowed = ArgumentMap::new();
    allowed.insert("frame".into(), frame);

    // The output policy never permits execution, and the input policy only
    // accepts the registered frame
    let code = CodeItem::new("sum", "fn sum(frame) { ... }", ["frame"])
        .with_output_policy(Arc::new(ExecuteLimit::new(0)))
        .with_input_policy(Arc::new(ExactInputs::new(allowed.clone())));
    let code_id = authorizer.codes().register(code).await?;
    approvals.set(code_id, Approval::approved()).await;

    let stray = Uid::new();
    authorizer
        .store()
        .set(
            stray,
            &steward,
            StoredObject::plain(Value::Bytes(vec![2])),
            SetOptions::default(),
        )
        .await?;
    let mut mismatched = ArgumentMap::new();
    mismatched.insert("frame".into(), stray);

    let refused = authorizer
        .call(code_id, &analyst, mismatched, CallOptions::default())
        .await;

    assert!(matches!(
        refused,
        Err(LatticeExecError::PolicyInvalid(reason)) if reason.contains("Input rejected")
    ));

    // Arguments the input policy accepts still cannot run; the output
    // policy's explanation is surfaced instead
    let refused = authorizer
        .call(code_id, &analyst, allowed, CallOptions::default())
        .await;

    assert!(matches!(
        refused,
        Err(LatticeExecError::PolicyInvalid(reason)) if reason.contains("limit of 0")
    ));

    Ok(())
}

#[tokio::test]
async fn it_requires_elevation_for_mock_execution() -> Result<()> {
    let Fixture { authorizer, .. } = fixture(
        StoredObject::plain(Value::UnsignedInt(1)),
        StaticRoleDirectory::new(),
    );
    let analyst = credential(1);

    // The analyst owns their probe object outright
    let probe = Uid::new();
    authorizer.store().take_ownership(probe, &analyst).await?;

    let code_id = authorizer
        .codes()
        .register(CodeItem::new("probe", "fn probe(sample) { ... }", ["sample"]))
        .await?;

    let mut arguments = ArgumentMap::new();
    arguments.insert("sample".into(), probe);

    let refused = authorizer
        .call(code_id, &analyst, arguments, CallOptions::default())
        .await;

    assert!(matches!(refused, Err(LatticeExecError::InputMismatch(_))));

    Ok(())
}

#[tokio::test]
async fn it_lets_permitted_callers_run_over_their_own_arguments() -> Result<()> {
    let mut directory = StaticRoleDirectory::new();
    let analyst = credential(1);
    directory.allow_mock_execution(analyst);

    let Fixture {
        authorizer, calls, ..
    } = fixture(StoredObject::plain(Value::UnsignedInt(1)), directory);

    let probe = Uid::new();
    authorizer.store().take_ownership(probe, &analyst).await?;
    authorizer
        .store()
        .set(
            probe,
            &analyst,
            StoredObject::plain(Value::Bytes(vec![1, 2])),
            SetOptions::default(),
        )
        .await?;

    let code_id = authorizer
        .codes()
        .register(CodeItem::new("probe", "fn probe(sample) { ... }", ["sample"]))
        .await?;

    let mut arguments = ArgumentMap::new();
    arguments.insert("sample".into(), probe);

    // Unapproved code, but mock execution is an override: no approval or
    // policy consulted, and nothing lands in history
    let outcome = authorizer
        .call(code_id, &analyst, arguments, CallOptions::default())
        .await?;

    assert!(outcome.executed().is_some());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(authorizer.history().execution_count(&code_id).await, 0);

    Ok(())
}

#[tokio::test]
async fn it_lets_administrators_bypass_approval_and_policy() -> Result<()> {
    let mut directory = StaticRoleDirectory::new();
    let admin = credential(9);
    directory.assign(admin, Role::Admin);

    let Fixture {
        authorizer, calls, ..
    } = fixture(StoredObject::plain(Value::UnsignedInt(7)), directory);

    let code_id = authorizer
        .codes()
        .register(CodeItem::new("audit", "fn audit() { ... }", Vec::<String>::new()))
        .await?;

    let outcome = authorizer
        .call(code_id, &admin, ArgumentMap::new(), CallOptions::default())
        .await?;

    // Admins read everything through role bypass, so the fresh payload is
    // visible despite no explicit read grant
    assert_eq!(
        outcome.executed(),
        Some(&Payload::Data(Value::UnsignedInt(7)))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(authorizer.history().execution_count(&code_id).await, 0);

    Ok(())
}

#[tokio::test]
async fn it_resolves_twin_results_by_the_callers_grants() -> Result<()> {
    let Fixture {
        authorizer,
        approvals,
        ..
    } = fixture(
        StoredObject::twin(
            Value::String("patient rows".into()),
            Value::String("synthetic rows".into()),
        ),
        StaticRoleDirectory::new(),
    );
    let analyst = credential(1);

    let code = CodeItem::new("rows", "fn rows() { ... }", Vec::<String>::new())
        .with_output_policy(Arc::new(ExecuteLimit::new(8)));
    let code_id = authorizer.codes().register(code).await?;
    approvals.set(code_id, Approval::approved()).await;

    // Without read access the caller sees only the mock half
    let outcome = authorizer
        .call(code_id, &analyst, ArgumentMap::new(), CallOptions::default())
        .await?;

    assert_eq!(
        outcome.executed(),
        Some(&Payload::Data(Value::String("synthetic rows".into())))
    );

    // With read access handed over, the private half is visible
    let outcome = authorizer
        .call(
            code_id,
            &analyst,
            ArgumentMap::new(),
            CallOptions {
                grant_read_to_caller: true,
                ..CallOptions::default()
            },
        )
        .await?;

    assert_eq!(
        outcome.executed(),
        Some(&Payload::Data(Value::String("patient rows".into())))
    );

    Ok(())
}

#[tokio::test]
async fn it_passes_computation_failures_through_as_results() -> Result<()> {
    let Fixture {
        authorizer,
        approvals,
        ..
    } = fixture(
        StoredObject::plain(Payload::Failure("division by zero".into())),
        StaticRoleDirectory::new(),
    );
    let analyst = credential(1);

    let code = CodeItem::new("ratio", "fn ratio() { ... }", Vec::<String>::new())
        .with_output_policy(Arc::new(ExecuteLimit::new(8)));
    let code_id = authorizer.codes().register(code).await?;
    approvals.set(code_id, Approval::approved()).await;

    let outcome = authorizer
        .call(code_id, &analyst, ArgumentMap::new(), CallOptions::default())
        .await?;

    // Failures carry no private content and are visible without any grant
    assert_eq!(
        outcome.executed(),
        Some(&Payload::Failure("division by zero".into()))
    );

    Ok(())
}

#[tokio::test]
async fn it_refuses_result_identifiers_that_are_already_in_use() -> Result<()> {
    let Fixture {
        authorizer,
        approvals,
        root,
        ..
    } = fixture(
        StoredObject::plain(Value::UnsignedInt(1)),
        StaticRoleDirectory::new(),
    );
    let analyst = credential(1);

    let code = CodeItem::new("noop", "fn noop() { ... }", Vec::<String>::new())
        .with_output_policy(Arc::new(ExecuteLimit::new(8)));
    let code_id = authorizer.codes().register(code).await?;
    approvals.set(code_id, Approval::approved()).await;

    let taken = Uid::new();
    authorizer
        .store()
        .set(
            taken,
            &root,
            StoredObject::plain(Value::Boolean(true)),
            SetOptions::default(),
        )
        .await?;

    let refused = authorizer
        .call(
            code_id,
            &analyst,
            ArgumentMap::new(),
            CallOptions {
                result_id: Some(taken),
                ..CallOptions::default()
            },
        )
        .await;

    assert!(matches!(refused, Err(LatticeExecError::Configuration(_))));

    Ok(())
}

#[tokio::test]
async fn it_records_out_of_band_executions_only_for_approved_code() -> Result<()> {
    let mut directory = StaticRoleDirectory::new();
    let admin = credential(9);
    directory.assign(admin, Role::Admin);

    let Fixture {
        authorizer,
        approvals,
        ..
    } = fixture(StoredObject::plain(Value::UnsignedInt(1)), directory);
    let analyst = credential(1);

    let code_id = authorizer
        .codes()
        .register(CodeItem::new("sync", "fn sync() { ... }", Vec::<String>::new()))
        .await?;

    let refused = authorizer
        .record_execution(code_id, &analyst, ArgumentMap::new(), vec![Uid::new()])
        .await;
    assert!(matches!(refused, Err(LatticeExecError::PolicyInvalid(_))));
    assert_eq!(authorizer.history().execution_count(&code_id).await, 0);

    // Administrators may record against unapproved code
    authorizer
        .record_execution(code_id, &admin, ArgumentMap::new(), vec![Uid::new()])
        .await?;

    approvals.set(code_id, Approval::approved()).await;
    authorizer
        .record_execution(code_id, &analyst, ArgumentMap::new(), vec![Uid::new()])
        .await?;

    assert_eq!(authorizer.history().execution_count(&code_id).await, 2);

    Ok(())
}

#[tokio::test]
async fn it_reports_unknown_code_items() -> Result<()> {
    let Fixture { authorizer, .. } = fixture(
        StoredObject::plain(Value::UnsignedInt(1)),
        StaticRoleDirectory::new(),
    );
    let missing = Uid::new();

    let refused = authorizer
        .call(
            missing,
            &credential(1),
            ArgumentMap::new(),
            CallOptions::default(),
        )
        .await;

    assert_eq!(refused, Err(LatticeExecError::CodeNotFound(missing)));

    Ok(())
}
