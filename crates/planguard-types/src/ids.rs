//! Stable identifiers for imports and outcome codes.
//!
//! Codes are short snake_case discriminators carried by errored outcomes and test results.

// Well-known imports
pub const IMPORT_TFPLAN: &str = "tfplan";
pub const IMPORT_TFCONFIG: &str = "tfconfig";
pub const IMPORT_TFSTATE: &str = "tfstate";
pub const IMPORT_TFRUN: &str = "tfrun";

// The distinguished rule whose value is the policy result.
pub const RULE_MAIN: &str = "main";

// Codes: evaluation errors
pub const CODE_UNKNOWN_IMPORT: &str = "unknown_import";
pub const CODE_UNKNOWN_ATTRIBUTE: &str = "unknown_attribute";
pub const CODE_INVALID_PATH: &str = "invalid_path";
pub const CODE_UNKNOWN_RULE: &str = "unknown_rule";
pub const CODE_DUPLICATE_RULE: &str = "duplicate_rule";
pub const CODE_MISSING_MAIN: &str = "missing_main";
pub const CODE_CYCLIC_RULE_DEPENDENCY: &str = "cyclic_rule_dependency";
pub const CODE_TYPE_MISMATCH: &str = "type_mismatch";
pub const CODE_UNBOUND_VARIABLE: &str = "unbound_variable";
pub const CODE_EVALUATION_ABORTED: &str = "evaluation_aborted";

// Codes: mock harness
pub const CODE_MOCK_TYPE_MISMATCH: &str = "mock_type_mismatch";
pub const CODE_MISSING_MOCK_IMPORT: &str = "missing_mock_import";
pub const CODE_INVALID_TEST_CASE: &str = "invalid_test_case";

// Tool-level
pub const CODE_INVALID_POLICY: &str = "invalid_policy";
