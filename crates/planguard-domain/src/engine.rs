use crate::enforcement;
use crate::error::EvalError;
use crate::expr::{Expr, Quantifier};
use crate::imports::ImportRegistry;
use crate::path;
use crate::policy::Policy;
use crate::value::{CompareOp, Element, Value, type_mismatch};
use planguard_types::{Decision, RuleResult};
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Clone, Debug, Default)]
pub struct EvalOptions {
    /// Evaluation fails with `Aborted` once this instant has passed.
    pub deadline: Option<Instant>,
}

pub fn evaluate(policy: &Policy, registry: &ImportRegistry) -> Result<Decision, EvalError> {
    evaluate_with(policy, registry, &EvalOptions::default())
}

pub fn evaluate_with(
    policy: &Policy,
    registry: &ImportRegistry,
    options: &EvalOptions,
) -> Result<Decision, EvalError> {
    // Cycles are rejected here, before any rule body runs.
    let order = policy.dependency_order()?;
    tracing::debug!(
        policy = policy.name(),
        rules = order.len(),
        "evaluating policy"
    );

    let mut evaluator = Evaluator {
        policy,
        registry,
        options,
        memo: vec![None; policy.rules().len()],
        violations: Vec::new(),
        scope: Vec::new(),
        stack: Vec::new(),
    };
    let main = evaluator.rule_value(policy.main_index())?;

    let mut rules = BTreeMap::new();
    for idx in order {
        if let Some(value) = &evaluator.memo[idx] {
            rules.insert(policy.rule(idx).name.clone(), rule_result(value));
        }
    }

    Ok(enforcement::decide(
        policy.name(),
        rule_result(&main),
        policy.level(),
        evaluator.violations,
        rules,
    ))
}

fn rule_result(value: &Value) -> RuleResult {
    match value {
        Value::Bool(true) => RuleResult::True,
        Value::Bool(false) => RuleResult::False,
        _ => RuleResult::Undefined,
    }
}

struct Evaluator<'p> {
    policy: &'p Policy,
    registry: &'p ImportRegistry,
    options: &'p EvalOptions,
    /// Rule values by arena index; each rule body runs at most once.
    memo: Vec<Option<Value>>,
    violations: Vec<String>,
    /// Quantifier bindings, innermost last.
    scope: Vec<(String, Value)>,
    /// Rules currently being evaluated, innermost last.
    stack: Vec<usize>,
}

impl<'p> Evaluator<'p> {
    fn check_deadline(&self) -> Result<(), EvalError> {
        if let Some(deadline) = self.options.deadline
            && Instant::now() >= deadline
        {
            return Err(EvalError::Aborted("run deadline exceeded".to_string()));
        }
        Ok(())
    }

    fn rule_value(&mut self, idx: usize) -> Result<Value, EvalError> {
        if let Some(value) = &self.memo[idx] {
            return Ok(value.clone());
        }
        self.check_deadline()?;

        let policy = self.policy;
        let rule = policy.rule(idx);
        tracing::debug!(policy = policy.name(), rule = %rule.name, "evaluating rule");

        // A rule body never sees the bindings of the rule that referenced it.
        let outer = std::mem::take(&mut self.scope);
        self.stack.push(idx);
        let result = self.eval(&rule.expr);
        self.stack.pop();
        self.scope = outer;

        let value = match result? {
            v @ (Value::Bool(_) | Value::Undefined) => v,
            other => {
                return Err(type_mismatch(
                    &format!("rule '{}'", rule.name),
                    "bool",
                    &other,
                ));
            }
        };
        tracing::debug!(policy = policy.name(), rule = %rule.name, result = %value, "rule evaluated");
        self.memo[idx] = Some(value.clone());
        Ok(value)
    }

    fn current_rule(&self) -> &str {
        self.stack
            .last()
            .map(|idx| self.policy.rule(*idx).name.as_str())
            .unwrap_or_default()
    }

    fn eval(&mut self, expr: &'p Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Attr { import, path } => self.registry.resolve(import, path),
            Expr::Var(name) => self.lookup_var(name),
            Expr::Get { of, path } => {
                let base = self.eval(of)?;
                let segments = path::parse(path)?;
                Ok(base.lookup(&segments).cloned().unwrap_or_default())
            }
            Expr::Rule(name) => {
                let idx = self
                    .policy
                    .index_of(name)
                    .ok_or_else(|| EvalError::UnknownRule {
                        rule: self.current_rule().to_string(),
                        reference: name.clone(),
                    })?;
                self.rule_value(idx)
            }

            Expr::Not(e) => {
                let truth = self.eval(e)?.truth("not")?;
                Ok(Value::from_truth(truth.map(|b| !b)))
            }
            Expr::And(es) => {
                let mut unknown = false;
                for e in es {
                    match self.eval(e)?.truth("and")? {
                        Some(false) => return Ok(Value::Bool(false)),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                Ok(if unknown {
                    Value::Undefined
                } else {
                    Value::Bool(true)
                })
            }
            Expr::Or(es) => {
                let mut unknown = false;
                for e in es {
                    match self.eval(e)?.truth("or")? {
                        Some(true) => return Ok(Value::Bool(true)),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                Ok(if unknown {
                    Value::Undefined
                } else {
                    Value::Bool(false)
                })
            }

            Expr::Eq(a, b) => {
                let (lhs, rhs) = self.eval_pair(a, b)?;
                Ok(lhs.equals(&rhs))
            }
            Expr::Ne(a, b) => {
                let (lhs, rhs) = self.eval_pair(a, b)?;
                let truth = lhs.equals(&rhs).truth("!=")?;
                Ok(Value::from_truth(truth.map(|b| !b)))
            }
            Expr::Lt(a, b) => self.compare(a, b, CompareOp::Lt),
            Expr::Le(a, b) => self.compare(a, b, CompareOp::Le),
            Expr::Gt(a, b) => self.compare(a, b, CompareOp::Gt),
            Expr::Ge(a, b) => self.compare(a, b, CompareOp::Ge),

            Expr::In(needle, haystack) => {
                let (needle, haystack) = self.eval_pair(needle, haystack)?;
                haystack.contains(&needle)
            }
            Expr::Contains(haystack, needle) => {
                let (haystack, needle) = self.eval_pair(haystack, needle)?;
                haystack.contains(&needle)
            }
            Expr::Length(e) => self.eval(e)?.length(),
            Expr::Else(e, default) => {
                let value = self.eval(e)?;
                if value.is_undefined() {
                    self.eval(default)
                } else {
                    Ok(value)
                }
            }

            Expr::Any(q) => {
                let over = self.eval(&q.over)?;
                over.any(|el| self.predicate(q, el))
            }
            Expr::All(q) => {
                let over = self.eval(&q.over)?;
                over.all(|el| self.predicate(q, el))
            }
            Expr::Filter(q) => {
                let over = self.eval(&q.over)?;
                over.filter(|el| self.predicate(q, el))
            }

            Expr::Print(parts) => {
                let mut message = String::new();
                for part in parts {
                    message.push_str(&self.eval(part)?.to_string());
                }
                tracing::debug!(rule = self.current_rule(), %message, "print");
                self.violations.push(message);
                Ok(Value::Bool(true))
            }
        }
    }

    fn eval_pair(&mut self, a: &'p Expr, b: &'p Expr) -> Result<(Value, Value), EvalError> {
        let lhs = self.eval(a)?;
        let rhs = self.eval(b)?;
        Ok((lhs, rhs))
    }

    fn compare(&mut self, a: &'p Expr, b: &'p Expr, op: CompareOp) -> Result<Value, EvalError> {
        let (lhs, rhs) = self.eval_pair(a, b)?;
        lhs.compare(&rhs, op)
    }

    fn lookup_var(&self, name: &str) -> Result<Value, EvalError> {
        self.scope
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| EvalError::UnboundVariable(name.to_string()))
    }

    /// Bind one collection member and evaluate the quantifier's condition.
    fn predicate(&mut self, q: &'p Quantifier, el: Element<'_>) -> Result<Option<bool>, EvalError> {
        self.check_deadline()?;

        let mark = self.scope.len();
        if let (Some(key_var), Some(key)) = (&q.key, el.key) {
            self.scope.push((key_var.clone(), Value::from(key)));
        }
        self.scope.push((q.var.clone(), el.value.clone()));
        let result = self.eval(&q.cond);
        self.scope.truncate(mark);

        result?.truth("quantifier condition")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{
        all, and, any, attr, eq, filter, ge, get, gt, le, length, lit, lt, member, ne, not, or,
        or_else, print, rule, var,
    };
    use crate::imports::ImportMode;
    use crate::policy::Rule;
    use crate::test_support::{
        instance_type_policy, policy, providers_policy, registry, resources_registry,
    };
    use planguard_types::EnforcementLevel;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn aws_provider_present_passes_advisory_without_violations() {
        let reg = registry("tfconfig", json!({"providers": ["aws", "google"]}));
        let decision =
            evaluate(&providers_policy(EnforcementLevel::Advisory), &reg).expect("evaluate");
        assert!(decision.passed);
        assert_eq!(decision.result, RuleResult::True);
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn aws_provider_missing_fails_hard_mandatory() {
        let reg = registry("tfconfig", json!({"providers": ["google"]}));
        let decision =
            evaluate(&providers_policy(EnforcementLevel::HardMandatory), &reg).expect("evaluate");
        assert!(!decision.passed);
        assert!(!decision.overridable);
        assert_eq!(decision.result, RuleResult::False);
    }

    #[test]
    fn undefined_instance_type_fails_and_names_the_resource() {
        let reg = resources_registry(json!([
            {"address": "aws_instance.web", "instance_type": "t3.micro"},
            {"address": "aws_instance.db", "instance_type": null},
            {"address": "aws_instance.cache", "instance_type": "t3.small"}
        ]));
        let decision = evaluate(
            &instance_type_policy(EnforcementLevel::SoftMandatory),
            &reg,
        )
        .expect("evaluate");

        assert!(!decision.passed);
        assert!(decision.overridable);
        assert_eq!(decision.result, RuleResult::Undefined);
        assert_eq!(decision.violations.len(), 1);
        assert!(
            decision.violations[0].contains("aws_instance.db"),
            "violation should name the resource: {:?}",
            decision.violations
        );
    }

    #[test]
    fn or_short_circuits_and_skips_prints() {
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![Rule::new(
                "main",
                or([lit(true), and([print([lit("never")]), lit(false)])]),
            )],
        );
        let decision = evaluate(&p, &ImportRegistry::default()).expect("evaluate");
        assert!(decision.passed);
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn prints_keep_emission_order_and_duplicates() {
        let p = policy(
            EnforcementLevel::Advisory,
            vec![Rule::new(
                "main",
                and([
                    print([lit("first")]),
                    print([lit("second")]),
                    print([lit("first")]),
                    lit(false),
                ]),
            )],
        );
        let decision = evaluate(&p, &ImportRegistry::default()).expect("evaluate");
        assert!(decision.passed, "advisory never blocks");
        assert_eq!(decision.violations, vec!["first", "second", "first"]);
    }

    #[test]
    fn shared_rules_run_once() {
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![
                Rule::new("main", and([rule("noisy"), rule("noisy")])),
                Rule::new("noisy", print([lit("ran")])),
            ],
        );
        let decision = evaluate(&p, &ImportRegistry::default()).expect("evaluate");
        assert_eq!(decision.violations, vec!["ran"]);
        assert_eq!(decision.rules["noisy"], RuleResult::True);
        assert_eq!(decision.rules["main"], RuleResult::True);
    }

    #[test]
    fn unreferenced_rules_are_not_reported() {
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![
                Rule::new("main", lit(true)),
                Rule::new("unused", print([lit("x")])),
            ],
        );
        let decision = evaluate(&p, &ImportRegistry::default()).expect("evaluate");
        assert!(!decision.rules.contains_key("unused"));
        assert!(decision.violations.is_empty());
    }

    #[test]
    fn cycles_fail_before_any_rule_runs() {
        let p = policy(
            EnforcementLevel::Advisory,
            vec![
                Rule::new("main", and([print([lit("started")]), rule("a")])),
                Rule::new("a", rule("b")),
                Rule::new("b", rule("a")),
            ],
        );
        let err = evaluate(&p, &ImportRegistry::default()).unwrap_err();
        assert!(matches!(err, EvalError::CyclicRuleDependency { .. }));
    }

    #[test]
    fn strict_unknown_attribute_aborts_evaluation() {
        let reg = registry("tfconfig", json!({"providers": []}));
        let p = policy(
            EnforcementLevel::Advisory,
            vec![Rule::new("main", eq(attr("tfconfig", "modules"), lit(0i64)))],
        );
        let err = evaluate(&p, &reg).unwrap_err();
        assert_eq!(err.code(), planguard_types::ids::CODE_UNKNOWN_ATTRIBUTE);
    }

    #[test]
    fn permissive_unknown_attribute_continues_as_undefined() {
        let reg = ImportRegistry::builder()
            .import_with_mode("tfrun", ImportMode::Permissive, json!({}))
            .build();
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![Rule::new(
                "main",
                or_else(eq(attr("tfrun", "workspace.name"), lit("prod")), lit(true)),
            )],
        );
        let decision = evaluate(&p, &reg).expect("evaluate");
        assert!(decision.passed);
    }

    #[test]
    fn unknown_import_is_surfaced() {
        let p = providers_policy(EnforcementLevel::Advisory);
        let err = evaluate(&p, &ImportRegistry::default()).unwrap_err();
        assert_eq!(err, EvalError::UnknownImport("tfconfig".to_string()));
    }

    #[test]
    fn expired_deadline_aborts() {
        let reg = registry("tfconfig", json!({"providers": ["aws"]}));
        let options = EvalOptions {
            deadline: Instant::now().checked_sub(Duration::from_millis(1)),
        };
        let err = evaluate_with(&providers_policy(EnforcementLevel::Advisory), &reg, &options)
            .unwrap_err();
        assert!(err.is_aborted());
    }

    #[test]
    fn map_quantifiers_bind_keys() {
        let reg = registry(
            "tfplan",
            json!({"resources": {"aws_s3_bucket.logs": {"acl": "private"}}}),
        );
        let mut q = match all(
            attr("tfplan", "resources"),
            "r",
            eq(get(var("r"), "acl"), lit("private")),
        ) {
            Expr::All(q) => q,
            _ => unreachable!(),
        };
        q.key = Some("address".to_string());
        q.cond = Box::new(and([
            *q.cond,
            eq(var("address"), lit("aws_s3_bucket.logs")),
        ]));
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![Rule::new("main", Expr::All(q))],
        );
        assert!(evaluate(&p, &reg).expect("evaluate").passed);
    }

    #[test]
    fn filter_and_length_compose() {
        let reg = resources_registry(json!([
            {"address": "a", "instance_type": "t3.micro"},
            {"address": "b", "instance_type": "m5.large"}
        ]));
        let large = filter(
            attr("tfplan", "resources"),
            "r",
            eq(get(var("r"), "instance_type"), lit("m5.large")),
        );
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![Rule::new("main", not(gt(length(large), lit(0i64))))],
        );
        assert_eq!(
            evaluate(&p, &reg).expect("evaluate").result,
            RuleResult::False
        );
    }

    #[test]
    fn any_over_list_with_rule_reference() {
        let reg = registry("tfconfig", json!({"providers": ["google", "aws"]}));
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![
                Rule::new("main", rule("has_aws")),
                Rule::new(
                    "has_aws",
                    any(attr("tfconfig", "providers"), "p", eq(var("p"), lit("aws"))),
                ),
            ],
        );
        let decision = evaluate(&p, &reg).expect("evaluate");
        assert!(decision.passed);
        assert_eq!(decision.rules["has_aws"], RuleResult::True);
    }

    #[test]
    fn bindings_do_not_leak_into_referenced_rules() {
        let reg = registry("tfconfig", json!({"providers": ["aws"]}));
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![
                Rule::new(
                    "main",
                    all(attr("tfconfig", "providers"), "p", rule("uses_p")),
                ),
                Rule::new("uses_p", eq(var("p"), lit("aws"))),
            ],
        );
        assert_eq!(
            evaluate(&p, &reg).unwrap_err(),
            EvalError::UnboundVariable("p".to_string())
        );
    }

    #[test]
    fn non_boolean_rule_is_a_type_error() {
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![Rule::new("main", lit("yes"))],
        );
        let err = evaluate(&p, &ImportRegistry::default()).unwrap_err();
        assert_eq!(err.code(), planguard_types::ids::CODE_TYPE_MISMATCH);
    }

    #[test]
    fn membership_against_undefined_needle_is_undefined() {
        let reg = registry("tfconfig", json!({"region": null, "allowed": ["us-east-1"]}));
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![Rule::new(
                "main",
                member(attr("tfconfig", "region"), attr("tfconfig", "allowed")),
            )],
        );
        assert_eq!(
            evaluate(&p, &reg).expect("evaluate").result,
            RuleResult::Undefined
        );
    }

    #[test]
    fn comparisons_and_inequality_propagate_undefined() {
        let reg = registry(
            "tfconfig",
            json!({"replicas": 3, "region": "us-east-1", "zone": null}),
        );
        let main_result = |expr: Expr| {
            let p = policy(EnforcementLevel::HardMandatory, vec![Rule::new("main", expr)]);
            evaluate(&p, &reg).expect("evaluate").result
        };
        let replicas = || attr("tfconfig", "replicas");
        let zone = || attr("tfconfig", "zone");

        assert_eq!(main_result(lt(replicas(), lit(4i64))), RuleResult::True);
        assert_eq!(main_result(le(replicas(), lit(3i64))), RuleResult::True);
        assert_eq!(main_result(ge(replicas(), lit(4i64))), RuleResult::False);
        assert_eq!(main_result(gt(replicas(), lit(2i64))), RuleResult::True);
        assert_eq!(
            main_result(le(attr("tfconfig", "region"), lit("us-west-2"))),
            RuleResult::True
        );
        assert_eq!(
            main_result(ne(attr("tfconfig", "region"), lit("eu-west-1"))),
            RuleResult::True
        );
        assert_eq!(main_result(ne(replicas(), lit(3i64))), RuleResult::False);

        assert_eq!(main_result(ne(zone(), lit("a"))), RuleResult::Undefined);
        assert_eq!(main_result(lt(zone(), lit(1i64))), RuleResult::Undefined);
        assert_eq!(main_result(ge(lit(1i64), zone())), RuleResult::Undefined);
    }

    #[test]
    fn ordering_across_kinds_is_a_type_error() {
        let reg = registry("tfconfig", json!({"replicas": 3}));
        let p = policy(
            EnforcementLevel::HardMandatory,
            vec![Rule::new("main", le(attr("tfconfig", "replicas"), lit("3")))],
        );
        let err = evaluate(&p, &reg).unwrap_err();
        assert_eq!(err.code(), planguard_types::ids::CODE_TYPE_MISMATCH);
    }
}
