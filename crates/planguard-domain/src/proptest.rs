//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Enforcement classification across levels and results
//! - Filter order preservation
//! - Cycle rejection regardless of rule layout
//! - Three-valued connectives

use crate::enforcement::classify;
use crate::engine::evaluate;
use crate::error::EvalError;
use crate::expr::{Expr, and, eq, filter, lit, or, rule, var};
use crate::imports::ImportRegistry;
use crate::policy::{Policy, Rule};
use crate::value::Value;
use planguard_types::{EnforcementLevel, RuleResult};
use proptest::prelude::*;

// ============================================================================
// Strategies for generating arbitrary values
// ============================================================================

fn arb_level() -> impl Strategy<Value = EnforcementLevel> {
    prop_oneof![
        Just(EnforcementLevel::Advisory),
        Just(EnforcementLevel::SoftMandatory),
        Just(EnforcementLevel::HardMandatory),
    ]
}

fn arb_result() -> impl Strategy<Value = RuleResult> {
    prop_oneof![
        Just(RuleResult::True),
        Just(RuleResult::False),
        Just(RuleResult::Undefined),
    ]
}

fn arb_truth() -> impl Strategy<Value = Option<bool>> {
    prop::option::of(any::<bool>())
}

fn arb_rule_name() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}")
        .unwrap()
        .prop_filter("main is reserved", |s| s != "main")
}

fn severity_rank(level: EnforcementLevel) -> u8 {
    match level {
        EnforcementLevel::Advisory => 0,
        EnforcementLevel::SoftMandatory => 1,
        EnforcementLevel::HardMandatory => 2,
    }
}

fn eval_main(expr: Expr) -> RuleResult {
    let policy = Policy::new(
        "prop",
        EnforcementLevel::HardMandatory,
        vec![Rule::new("main", expr)],
    )
    .expect("policy");
    evaluate(&policy, &ImportRegistry::default())
        .expect("evaluate")
        .result
}

// ============================================================================
// Enforcement
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn hard_mandatory_failures_are_never_overridable(result in arb_result()) {
        let e = classify(result, EnforcementLevel::HardMandatory);
        prop_assert!(!e.overridable);
        prop_assert_eq!(e.passed, result.is_true());
    }

    #[test]
    fn passing_is_monotone_in_level(result in arb_result(), a in arb_level(), b in arb_level()) {
        // Stricter levels never pass what a looser level blocks.
        let (looser, stricter) = if severity_rank(a) <= severity_rank(b) { (a, b) } else { (b, a) };
        if classify(result, stricter).passed {
            prop_assert!(classify(result, looser).passed);
        }
    }

    #[test]
    fn true_passes_everywhere(level in arb_level()) {
        prop_assert!(classify(RuleResult::True, level).passed);
    }
}

// ============================================================================
// Collections
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn filter_preserves_order_and_is_idempotent(
        items in prop::collection::vec(0i64..20, 0..30),
        threshold in 0i64..20,
    ) {
        let list = Value::from(items.clone());
        let keep = |v: &Value| matches!(v, Value::Number(n) if *n >= threshold as f64);

        let once = list
            .filter(|el| Ok(Some(keep(el.value))))
            .expect("filter");
        let twice = once
            .filter(|el| Ok(Some(keep(el.value))))
            .expect("filter");

        let expected: Vec<i64> = items.into_iter().filter(|n| *n >= threshold).collect();
        prop_assert_eq!(&once, &Value::from(expected));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn filter_expression_agrees_with_iterator_filter(items in prop::collection::vec(0i64..5, 0..20)) {
        let expected: Vec<i64> = items.iter().filter(|n| **n == 3).copied().collect();
        let kept = filter(lit(items), "x", eq(var("x"), lit(3i64)));
        prop_assert_eq!(eval_main(eq(kept, lit(expected))), RuleResult::True);
    }
}

// ============================================================================
// Rule graph
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn self_reference_is_always_rejected(name in arb_rule_name()) {
        let policy = Policy::new(
            "prop",
            EnforcementLevel::Advisory,
            vec![Rule::new("main", rule(&name)), Rule::new(name.clone(), rule(&name))],
        )
        .expect("policy");
        let err = evaluate(&policy, &ImportRegistry::default()).unwrap_err();
        prop_assert_eq!(err, EvalError::CyclicRuleDependency { cycle: vec![name.clone(), name] });
    }

    #[test]
    fn mutual_reference_is_always_rejected(a in arb_rule_name(), b in arb_rule_name()) {
        prop_assume!(a != b);
        let policy = Policy::new(
            "prop",
            EnforcementLevel::Advisory,
            vec![
                Rule::new("main", lit(true)),
                Rule::new(a.clone(), rule(&b)),
                Rule::new(b.clone(), rule(&a)),
            ],
        )
        .expect("policy");
        let err = evaluate(&policy, &ImportRegistry::default()).unwrap_err();
        let EvalError::CyclicRuleDependency { cycle } = err else {
            return Err(TestCaseError::fail("expected a cycle"));
        };
        prop_assert_eq!(cycle.first(), cycle.last());
        prop_assert!(cycle.contains(&a) && cycle.contains(&b));
    }
}

// ============================================================================
// Three-valued logic
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn connectives_follow_kleene_tables(x in arb_truth(), y in arb_truth()) {
        let and_expected = match (x, y) {
            (Some(false), _) | (_, Some(false)) => RuleResult::False,
            (Some(true), Some(true)) => RuleResult::True,
            _ => RuleResult::Undefined,
        };
        let or_expected = match (x, y) {
            (Some(true), _) | (_, Some(true)) => RuleResult::True,
            (Some(false), Some(false)) => RuleResult::False,
            _ => RuleResult::Undefined,
        };

        let lx = lit(Value::from_truth(x));
        let ly = lit(Value::from_truth(y));
        prop_assert_eq!(eval_main(and([lx.clone(), ly.clone()])), and_expected);
        prop_assert_eq!(eval_main(or([lx, ly])), or_expected);
    }
}
