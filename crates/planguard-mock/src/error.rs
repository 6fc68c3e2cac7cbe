use planguard_domain::EvalError;
use planguard_types::ids;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HarnessError {
    #[error("mock '{import}.{path}' is {found}, but the policy uses it as {expected}")]
    MockTypeMismatch {
        import: String,
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("policy uses import '{0}' but the test case has no mock for it")]
    MissingMockImport(String),

    #[error("invalid test case '{case}': {reason}")]
    InvalidCase { case: String, reason: String },

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl HarnessError {
    pub fn code(&self) -> &'static str {
        match self {
            HarnessError::MockTypeMismatch { .. } => ids::CODE_MOCK_TYPE_MISMATCH,
            HarnessError::MissingMockImport(_) => ids::CODE_MISSING_MOCK_IMPORT,
            HarnessError::InvalidCase { .. } => ids::CODE_INVALID_TEST_CASE,
            HarnessError::Eval(e) => e.code(),
        }
    }
}
