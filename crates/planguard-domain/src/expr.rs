//! Rule expression trees.
//!
//! The serde form is externally tagged and snake_case so policies can be written
//! as TOML or JSON documents:
//!
//! ```toml
//! expr = { in = [{ literal = "aws" }, { attr = { import = "tfconfig", path = "providers" } }] }
//! ```

use crate::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    /// Attribute of an import, resolved through the registry.
    Attr { import: String, path: String },
    /// Variable bound by an enclosing quantifier.
    Var(String),
    /// Attribute of a computed value. Missing members are Undefined.
    Get { of: Box<Expr>, path: String },
    /// Value of another rule in the same policy.
    Rule(String),

    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),

    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),

    /// `needle in haystack`.
    In(Box<Expr>, Box<Expr>),
    /// `haystack contains needle`.
    Contains(Box<Expr>, Box<Expr>),
    Length(Box<Expr>),
    /// Left side unless it is Undefined, then the right side.
    Else(Box<Expr>, Box<Expr>),

    Any(Quantifier),
    All(Quantifier),
    Filter(Quantifier),

    /// Appends the concatenated parts to the decision's violations; evaluates to true.
    Print(Vec<Expr>),
}

/// `all <over> as <key>, <var> { <cond> }`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantifier {
    pub over: Box<Expr>,
    #[serde(rename = "as")]
    pub var: String,
    /// For maps: also bind the member's key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "where")]
    pub cond: Box<Expr>,
}

impl Expr {
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Literal(_) | Expr::Attr { .. } | Expr::Var(_) | Expr::Rule(_) => Vec::new(),
            Expr::Get { of, .. } => vec![&**of],
            Expr::Not(e) | Expr::Length(e) => vec![&**e],
            Expr::And(es) | Expr::Or(es) | Expr::Print(es) => es.iter().collect(),
            Expr::Eq(a, b)
            | Expr::Ne(a, b)
            | Expr::Lt(a, b)
            | Expr::Le(a, b)
            | Expr::Gt(a, b)
            | Expr::Ge(a, b)
            | Expr::In(a, b)
            | Expr::Contains(a, b)
            | Expr::Else(a, b) => vec![&**a, &**b],
            Expr::Any(q) | Expr::All(q) | Expr::Filter(q) => vec![&*q.over, &*q.cond],
        }
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }

    /// Names of rules referenced anywhere in this expression.
    pub fn rule_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Rule(name) = e {
                out.push(name.as_str());
            }
        });
        out
    }

    /// Names of imports referenced anywhere in this expression.
    pub fn import_refs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Attr { import, .. } = e {
                out.push(import.as_str());
            }
        });
        out
    }
}

// Constructors for building policies in code.

pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

pub fn attr(import: &str, path: &str) -> Expr {
    Expr::Attr {
        import: import.to_string(),
        path: path.to_string(),
    }
}

pub fn var(name: &str) -> Expr {
    Expr::Var(name.to_string())
}

pub fn get(of: Expr, path: &str) -> Expr {
    Expr::Get {
        of: Box::new(of),
        path: path.to_string(),
    }
}

pub fn rule(name: &str) -> Expr {
    Expr::Rule(name.to_string())
}

pub fn not(e: Expr) -> Expr {
    Expr::Not(Box::new(e))
}

pub fn and(es: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::And(es.into_iter().collect())
}

pub fn or(es: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Or(es.into_iter().collect())
}

pub fn eq(a: Expr, b: Expr) -> Expr {
    Expr::Eq(Box::new(a), Box::new(b))
}

pub fn ne(a: Expr, b: Expr) -> Expr {
    Expr::Ne(Box::new(a), Box::new(b))
}

pub fn lt(a: Expr, b: Expr) -> Expr {
    Expr::Lt(Box::new(a), Box::new(b))
}

pub fn le(a: Expr, b: Expr) -> Expr {
    Expr::Le(Box::new(a), Box::new(b))
}

pub fn gt(a: Expr, b: Expr) -> Expr {
    Expr::Gt(Box::new(a), Box::new(b))
}

pub fn ge(a: Expr, b: Expr) -> Expr {
    Expr::Ge(Box::new(a), Box::new(b))
}

/// `needle in haystack`.
pub fn member(needle: Expr, haystack: Expr) -> Expr {
    Expr::In(Box::new(needle), Box::new(haystack))
}

pub fn length(e: Expr) -> Expr {
    Expr::Length(Box::new(e))
}

pub fn or_else(e: Expr, default: Expr) -> Expr {
    Expr::Else(Box::new(e), Box::new(default))
}

fn quantifier(over: Expr, var: &str, cond: Expr) -> Quantifier {
    Quantifier {
        over: Box::new(over),
        var: var.to_string(),
        key: None,
        cond: Box::new(cond),
    }
}

pub fn any(over: Expr, var: &str, cond: Expr) -> Expr {
    Expr::Any(quantifier(over, var, cond))
}

pub fn all(over: Expr, var: &str, cond: Expr) -> Expr {
    Expr::All(quantifier(over, var, cond))
}

pub fn filter(over: Expr, var: &str, cond: Expr) -> Expr {
    Expr::Filter(quantifier(over, var, cond))
}

pub fn print(parts: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::Print(parts.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_tagged_json_form() {
        let e: Expr = serde_json::from_value(json!({
            "all": {
                "over": {"attr": {"import": "tfplan", "path": "resources"}},
                "as": "r",
                "where": {"in": [
                    {"get": {"of": {"var": "r"}, "path": "instance_type"}},
                    {"literal": ["t3.micro"]}
                ]}
            }
        }))
        .expect("deserialize");

        let expected = all(
            attr("tfplan", "resources"),
            "r",
            member(get(var("r"), "instance_type"), lit(vec!["t3.micro"])),
        );
        assert_eq!(e, expected);
    }

    #[test]
    fn collects_rule_and_import_references() {
        let e = and([
            rule("has_aws"),
            or([rule("is_prod"), member(lit("x"), attr("tfconfig", "providers"))]),
            not(rule("has_aws")),
        ]);
        assert_eq!(e.rule_refs(), vec!["has_aws", "is_prod", "has_aws"]);
        assert_eq!(e.import_refs(), vec!["tfconfig"]);
    }
}
