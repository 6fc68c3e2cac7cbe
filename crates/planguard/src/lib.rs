//! Embeddable policy evaluation.
//!
//! Build a [`Policy`] from named rules, snapshot the run's data into an
//! [`ImportRegistry`], and [`evaluate`] to get a [`Decision`] classified by the
//! policy's [`EnforcementLevel`]. [`run_test`] does the same against mock data.
//!
//! ```
//! use planguard::expr::{attr, lit, member};
//! use planguard::{EnforcementLevel, ImportRegistry, Policy, Rule, evaluate};
//!
//! let policy = Policy::new(
//!     "require-aws",
//!     EnforcementLevel::HardMandatory,
//!     vec![Rule::new("main", member(lit("aws"), attr("tfconfig", "providers")))],
//! )?;
//! let registry = ImportRegistry::builder()
//!     .import("tfconfig", serde_json::json!({ "providers": ["google"] }))
//!     .build();
//!
//! let decision = evaluate(&policy, &registry)?;
//! assert!(!decision.passed);
//! assert!(!decision.overridable);
//! # Ok::<(), planguard::EvalError>(())
//! ```

#![forbid(unsafe_code)]

pub use planguard_domain::enforcement::{Enforcement, classify, decide};
pub use planguard_domain::{
    EvalError, EvalOptions, Expr, Import, ImportMode, ImportRegistry, ImportRegistryBuilder,
    Policy, Quantifier, Rule, Value, evaluate, evaluate_with, expr,
};
pub use planguard_mock::{
    Expectation, HarnessError, MockFixtures, TestCase, TestSuite, run_case, run_test, typecheck,
};
pub use planguard_types::{Decision, EnforcementLevel, PolicyOutcome, RuleResult, TestResult};
