//! Pure policy evaluation (no IO).
//!
//! Input: a policy (rules in an arena) and an immutable import snapshot.
//! Output: a decision classified by the policy's enforcement level.

#![forbid(unsafe_code)]

pub mod enforcement;
pub mod error;
pub mod expr;
pub mod imports;
pub mod path;
pub mod policy;
pub mod value;

mod engine;

#[cfg(test)]
mod proptest;
#[cfg(test)]
mod test_support;

pub use engine::{EvalOptions, evaluate, evaluate_with};
pub use error::EvalError;
pub use expr::{Expr, Quantifier};
pub use imports::{Import, ImportMode, ImportRegistry, ImportRegistryBuilder};
pub use policy::{Policy, Rule};
pub use value::Value;
