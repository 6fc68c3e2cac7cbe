use planguard_types::ids;

/// Errors raised while building or evaluating a policy.
///
/// Load-time kinds (`DuplicateRule`, `MissingMain`, `UnknownRule`, `CyclicRuleDependency`)
/// are raised before any rule body runs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown import '{0}'")]
    UnknownImport(String),

    #[error("unknown attribute '{path}' on import '{import}'")]
    UnknownAttribute { import: String, path: String },

    #[error("invalid attribute path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("rule '{rule}' references unknown rule '{reference}'")]
    UnknownRule { rule: String, reference: String },

    #[error("rule '{0}' is defined more than once")]
    DuplicateRule(String),

    #[error("policy '{0}' has no main rule")]
    MissingMain(String),

    #[error("cyclic rule dependency: {}", .cycle.join(" -> "))]
    CyclicRuleDependency { cycle: Vec<String> },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unbound variable '{0}'")]
    UnboundVariable(String),

    #[error("evaluation aborted: {0}")]
    Aborted(String),
}

impl EvalError {
    /// Stable code for reports.
    pub fn code(&self) -> &'static str {
        match self {
            EvalError::UnknownImport(_) => ids::CODE_UNKNOWN_IMPORT,
            EvalError::UnknownAttribute { .. } => ids::CODE_UNKNOWN_ATTRIBUTE,
            EvalError::InvalidPath { .. } => ids::CODE_INVALID_PATH,
            EvalError::UnknownRule { .. } => ids::CODE_UNKNOWN_RULE,
            EvalError::DuplicateRule(_) => ids::CODE_DUPLICATE_RULE,
            EvalError::MissingMain(_) => ids::CODE_MISSING_MAIN,
            EvalError::CyclicRuleDependency { .. } => ids::CODE_CYCLIC_RULE_DEPENDENCY,
            EvalError::TypeMismatch { .. } => ids::CODE_TYPE_MISMATCH,
            EvalError::UnboundVariable(_) => ids::CODE_UNBOUND_VARIABLE,
            EvalError::Aborted(_) => ids::CODE_EVALUATION_ABORTED,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, EvalError::Aborted(_))
    }
}
