//! Policies: an arena of named rules addressed by integer index.
//!
//! Rule references are resolved to indices when the policy is built, so the
//! dependency graph is explicit and can be ordered (and checked for cycles)
//! before any rule body runs.

use crate::error::EvalError;
use crate::expr::Expr;
use planguard_types::{EnforcementLevel, ids};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Clone, Debug, PartialEq)]
pub struct Rule {
    pub name: String,
    pub expr: Expr,
}

impl Rule {
    pub fn new(name: impl Into<String>, expr: Expr) -> Self {
        Self {
            name: name.into(),
            expr,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Policy {
    name: String,
    level: EnforcementLevel,
    rules: Vec<Rule>,
    by_name: BTreeMap<String, usize>,
    /// `deps[i]`: indices of the rules rule `i` references.
    deps: Vec<BTreeSet<usize>>,
    main: usize,
}

impl Policy {
    /// Build a policy from rules in declaration order.
    ///
    /// Fails on duplicate rule names, a missing `main` rule, or references to
    /// rules that do not exist. Cycles are reported by [`Policy::dependency_order`].
    pub fn new(
        name: impl Into<String>,
        level: EnforcementLevel,
        rules: Vec<Rule>,
    ) -> Result<Self, EvalError> {
        let name = name.into();

        let mut by_name = BTreeMap::new();
        for (idx, rule) in rules.iter().enumerate() {
            if by_name.insert(rule.name.clone(), idx).is_some() {
                return Err(EvalError::DuplicateRule(rule.name.clone()));
            }
        }

        let main = *by_name
            .get(ids::RULE_MAIN)
            .ok_or_else(|| EvalError::MissingMain(name.clone()))?;

        let mut deps = Vec::with_capacity(rules.len());
        for rule in &rules {
            let mut edges = BTreeSet::new();
            for reference in rule.expr.rule_refs() {
                let idx = by_name
                    .get(reference)
                    .ok_or_else(|| EvalError::UnknownRule {
                        rule: rule.name.clone(),
                        reference: reference.to_string(),
                    })?;
                edges.insert(*idx);
            }
            deps.push(edges);
        }

        Ok(Self {
            name,
            level,
            rules,
            by_name,
            deps,
            main,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> EnforcementLevel {
        self.level
    }

    /// Enforcement level is fixed at load time; configuration may still replace it then.
    pub fn with_level(mut self, level: EnforcementLevel) -> Self {
        self.level = level;
        self
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, idx: usize) -> &Rule {
        &self.rules[idx]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn main_index(&self) -> usize {
        self.main
    }

    pub fn dependencies(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.deps[idx].iter().copied()
    }

    /// Imports referenced by any rule, sorted and deduplicated.
    pub fn imports(&self) -> BTreeSet<&str> {
        self.rules
            .iter()
            .flat_map(|r| r.expr.import_refs())
            .collect()
    }

    /// Topological order of the rule arena: every rule comes after the rules it references.
    ///
    /// Ties are broken by declaration order so the result is deterministic.
    pub fn dependency_order(&self) -> Result<Vec<usize>, EvalError> {
        let n = self.rules.len();
        let mut indegree: Vec<usize> = self.deps.iter().map(BTreeSet::len).collect();
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (idx, edges) in self.deps.iter().enumerate() {
            for dep in edges {
                dependents[*dep].push(idx);
            }
        }

        let mut ready: VecDeque<usize> = (0..n).filter(|i| indegree[*i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(idx) = ready.pop_front() {
            order.push(idx);
            for dependent in &dependents[idx] {
                indegree[*dependent] -= 1;
                if indegree[*dependent] == 0 {
                    ready.push_back(*dependent);
                }
            }
        }

        if order.len() < n {
            let placed: BTreeSet<usize> = order.iter().copied().collect();
            return Err(EvalError::CyclicRuleDependency {
                cycle: self.find_cycle(&placed),
            });
        }
        Ok(order)
    }

    /// Every unplaced rule depends on another unplaced rule, so walking
    /// dependencies from the first one must revisit a rule.
    fn find_cycle(&self, placed: &BTreeSet<usize>) -> Vec<String> {
        let Some(start) = (0..self.rules.len()).find(|i| !placed.contains(i)) else {
            return Vec::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut current = start;
        loop {
            if let Some(pos) = path.iter().position(|i| *i == current) {
                let mut cycle: Vec<String> = path[pos..]
                    .iter()
                    .map(|i| self.rules[*i].name.clone())
                    .collect();
                cycle.push(self.rules[current].name.clone());
                return cycle;
            }
            path.push(current);
            match self.deps[current].iter().find(|d| !placed.contains(*d)) {
                Some(next) => current = *next,
                None => return path.iter().map(|i| self.rules[*i].name.clone()).collect(),
            }
        }
    }
}
