//! Runtime values seen by rule logic.
//!
//! `Undefined` models an unknown value (for example a plan attribute that is only
//! known after apply). It propagates through comparisons and collection
//! operations instead of failing, and is never coerced to `false`.

use crate::error::EvalError;
use crate::path::Segment;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "JsonValue", into = "JsonValue")]
pub enum Value {
    #[default]
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// One member of a collection. Map members carry their key.
#[derive(Clone, Copy, Debug)]
pub struct Element<'a> {
    pub key: Option<&'a str>,
    pub value: &'a Value,
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Three-valued truthiness: `Some(b)` for booleans, `None` for Undefined.
    pub fn truth(&self, context: &str) -> Result<Option<bool>, EvalError> {
        match self {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Undefined => Ok(None),
            other => Err(type_mismatch(context, "bool", other)),
        }
    }

    pub fn from_truth(truth: Option<bool>) -> Value {
        truth.map(Value::Bool).unwrap_or(Value::Undefined)
    }

    /// Follow `segments` from this value. Missing members yield `None`.
    pub fn lookup(&self, segments: &[Segment]) -> Option<&Value> {
        let mut current = self;
        for segment in segments {
            current = match (current, segment) {
                (Value::Undefined, _) => return Some(current),
                (Value::Map(map), Segment::Key(key)) => map.get(key)?,
                (Value::Map(map), Segment::Index(idx)) => map.get(&idx.to_string())?,
                (Value::List(items), Segment::Index(idx)) => items.get(*idx)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Structural equality; Undefined on either side is unknown.
    pub fn equals(&self, other: &Value) -> Value {
        if self.is_undefined() || other.is_undefined() {
            return Value::Undefined;
        }
        Value::Bool(self == other)
    }

    pub fn compare(&self, other: &Value, op: CompareOp) -> Result<Value, EvalError> {
        let ordering = match (self, other) {
            (Value::Undefined, _) | (_, Value::Undefined) => return Ok(Value::Undefined),
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (a, b) => {
                let found = if matches!(a, Value::Number(_) | Value::String(_)) {
                    b
                } else {
                    a
                };
                return Err(type_mismatch(
                    &format!("'{}' comparison", op.symbol()),
                    "matching numbers or strings",
                    found,
                ));
            }
        };
        // NaN orders against nothing.
        let Some(ordering) = ordering else {
            return Ok(Value::Bool(false));
        };
        Ok(Value::Bool(match op {
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }))
    }

    /// List membership, map key membership, or substring.
    pub fn contains(&self, needle: &Value) -> Result<Value, EvalError> {
        match (self, needle) {
            (Value::Undefined, _) | (_, Value::Undefined) => Ok(Value::Undefined),
            (Value::List(items), needle) => Ok(Value::Bool(items.iter().any(|i| i == needle))),
            (Value::Map(map), Value::String(key)) => Ok(Value::Bool(map.contains_key(key))),
            (Value::Map(_), other) => Err(type_mismatch("map key lookup", "string", other)),
            (Value::String(s), Value::String(sub)) => Ok(Value::Bool(s.contains(sub.as_str()))),
            (Value::String(_), other) => Err(type_mismatch("substring test", "string", other)),
            (other, _) => Err(type_mismatch("contains", "list, map or string", other)),
        }
    }

    pub fn length(&self) -> Result<Value, EvalError> {
        match self {
            Value::Undefined => Ok(Value::Undefined),
            Value::List(items) => Ok(Value::Number(items.len() as f64)),
            Value::Map(map) => Ok(Value::Number(map.len() as f64)),
            Value::String(s) => Ok(Value::Number(s.chars().count() as f64)),
            other => Err(type_mismatch("length", "list, map or string", other)),
        }
    }

    /// `None` when the collection itself is Undefined.
    pub fn elements(&self, context: &str) -> Result<Option<Vec<Element<'_>>>, EvalError> {
        match self {
            Value::Undefined => Ok(None),
            Value::List(items) => Ok(Some(
                items
                    .iter()
                    .map(|value| Element { key: None, value })
                    .collect(),
            )),
            Value::Map(map) => Ok(Some(
                map.iter()
                    .map(|(k, value)| Element {
                        key: Some(k.as_str()),
                        value,
                    })
                    .collect(),
            )),
            other => Err(type_mismatch(context, "list or map", other)),
        }
    }

    /// Keep the members for which `pred` is true, in their original order.
    ///
    /// Members whose predicate is Undefined are dropped. The input is not modified.
    pub fn filter<F>(&self, mut pred: F) -> Result<Value, EvalError>
    where
        F: FnMut(Element<'_>) -> Result<Option<bool>, EvalError>,
    {
        match self {
            Value::Undefined => Ok(Value::Undefined),
            Value::List(items) => {
                let mut kept = Vec::new();
                for value in items {
                    if pred(Element { key: None, value })? == Some(true) {
                        kept.push(value.clone());
                    }
                }
                Ok(Value::List(kept))
            }
            Value::Map(map) => {
                let mut kept = BTreeMap::new();
                for (key, value) in map {
                    let el = Element {
                        key: Some(key.as_str()),
                        value,
                    };
                    if pred(el)? == Some(true) {
                        kept.insert(key.clone(), value.clone());
                    }
                }
                Ok(Value::Map(kept))
            }
            other => Err(type_mismatch("filter", "list or map", other)),
        }
    }

    /// Stops at the first member whose predicate is true.
    pub fn any<F>(&self, mut pred: F) -> Result<Value, EvalError>
    where
        F: FnMut(Element<'_>) -> Result<Option<bool>, EvalError>,
    {
        let Some(elements) = self.elements("any")? else {
            return Ok(Value::Undefined);
        };
        let mut unknown = false;
        for el in elements {
            match pred(el)? {
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

    /// Stops at the first member whose predicate is false.
    pub fn all<F>(&self, mut pred: F) -> Result<Value, EvalError>
    where
        F: FnMut(Element<'_>) -> Result<Option<bool>, EvalError>,
    {
        let Some(elements) = self.elements("all")? else {
            return Ok(Value::Undefined);
        };
        let mut unknown = false;
        for el in elements {
            match pred(el)? {
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
}

pub(crate) fn type_mismatch(context: &str, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        context: context.to_string(),
        expected,
        found: found.kind(),
    }
}

impl fmt::Display for Value {
    /// Top-level strings render bare so `print` output reads naturally.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => write_nested(other, f),
        }
    }
}

fn write_nested(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Undefined => f.write_str("undefined"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) => write_number(*n, f),
        Value::String(s) => write!(f, "{s:?}"),
        Value::List(items) => {
            f.write_str("[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_nested(item, f)?;
            }
            f.write_str("]")
        }
        Value::Map(map) => {
            f.write_str("{")?;
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{k:?}: ")?;
                write_nested(v, f)?;
            }
            f.write_str("}")
        }
    }
}

fn write_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::Undefined,
            JsonValue::Bool(b) => Value::Bool(b),
            JsonValue::Number(n) => n.as_f64().map(Value::Number).unwrap_or_default(),
            JsonValue::String(s) => Value::String(s),
            JsonValue::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Undefined => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    JsonValue::from(n as i64)
                } else {
                    serde_json::Number::from_f64(n)
                        .map(JsonValue::Number)
                        .unwrap_or(JsonValue::Null)
                }
            }
            Value::String(s) => JsonValue::String(s),
            Value::List(items) => JsonValue::Array(items.into_iter().map(JsonValue::from).collect()),
            Value::Map(map) => JsonValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, JsonValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}
