use crate::{
    ArgumentMap, InputPolicy, LatticePolicyError, OutputPolicy, PolicyContext, Verdict,
};

/// An [`OutputPolicy`] that permits a bounded number of executions.
///
/// The counter is derived from the code item's execution records, so the
/// policy itself carries no state and needs no update hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteLimit {
    limit: usize,
}

impl ExecuteLimit {
    /// A policy permitting up to `limit` executions
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// A policy permitting a single execution
    pub fn once() -> Self {
        Self::new(1)
    }
}

impl OutputPolicy for ExecuteLimit {
    fn evaluate(&self, context: &PolicyContext<'_>) -> Verdict {
        if context.executions.len() < self.limit {
            Verdict::Valid
        } else {
            Verdict::invalid(format!(
                "Execution limit of {} reached; historical results remain available",
                self.limit
            ))
        }
    }
}

/// An [`InputPolicy`] that only accepts one exact argument map: the same
/// parameter names bound to the same identifiers that were registered with
/// the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExactInputs {
    allowed: ArgumentMap,
}

impl ExactInputs {
    /// A policy accepting exactly the given argument map
    pub fn new(allowed: ArgumentMap) -> Self {
        Self { allowed }
    }
}

impl InputPolicy for ExactInputs {
    fn validate(
        &self,
        _context: &PolicyContext<'_>,
        arguments: &ArgumentMap,
    ) -> Result<(), LatticePolicyError> {
        if arguments == &self.allowed {
            Ok(())
        } else {
            Err(LatticePolicyError::InputRejected(
                "Arguments do not match the inputs registered for this code".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use lattice_common::{Credential, Role, Uid};

    use crate::{
        ArgumentMap, ExecutionRecord, InputPolicy, LatticePolicyError, OutputPolicy,
        PolicyContext,
    };

    use super::{ExactInputs, ExecuteLimit};

    fn context<'a>(
        code: Uid,
        credential: &'a Credential,
        executions: &'a [ExecutionRecord],
    ) -> PolicyContext<'a> {
        PolicyContext {
            code,
            credential,
            role: Role::Guest,
            executions,
        }
    }

    #[test]
    fn it_invalidates_once_the_execution_limit_is_reached() {
        let credential = Credential::from_bytes([1u8; 32]);
        let code = Uid::new();
        let policy = ExecuteLimit::once();

        let none: Vec<ExecutionRecord> = vec![];
        assert!(policy.evaluate(&context(code, &credential, &none)).is_valid());

        let one = vec![ExecutionRecord::new(ArgumentMap::new(), vec![])];
        let verdict = policy.evaluate(&context(code, &credential, &one));

        assert!(!verdict.is_valid());
        assert!(verdict.reason().unwrap().contains("limit of 1"));
    }

    #[test]
    fn it_rejects_arguments_that_differ_from_the_registered_inputs() {
        let credential = Credential::from_bytes([1u8; 32]);
        let code = Uid::new();

        let mut allowed = ArgumentMap::new();
        allowed.insert("frame".into(), Uid::new());
        let policy = ExactInputs::new(allowed.clone());

        let none: Vec<ExecutionRecord> = vec![];
        assert_eq!(
            policy.validate(&context(code, &credential, &none), &allowed),
            Ok(())
        );

        let mut altered = allowed.clone();
        altered.insert("frame".into(), Uid::new());
        assert!(matches!(
            policy.validate(&context(code, &credential, &none), &altered),
            Err(LatticePolicyError::InputRejected(_))
        ));
    }
}
