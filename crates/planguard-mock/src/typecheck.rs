//! Static shape check of mock data against how a policy uses it.

use crate::error::HarnessError;
use crate::fixtures::MockFixtures;
use planguard_domain::path::{self, Segment};
use planguard_domain::{Expr, ImportRegistry, Policy, Quantifier, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Shape {
    /// Quantifier and filter sources.
    Collection,
    /// `in`/`contains` haystacks and `length` arguments.
    Container,
    /// Connective operands, quantifier conditions and rule bodies.
    Boolean,
}

impl Shape {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Shape::Collection => matches!(value, Value::List(_) | Value::Map(_)),
            Shape::Container => {
                matches!(value, Value::List(_) | Value::Map(_) | Value::String(_))
            }
            Shape::Boolean => matches!(value, Value::Bool(_)),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Shape::Collection => "list or map",
            Shape::Container => "list, map or string",
            Shape::Boolean => "bool",
        }
    }
}

/// Check that every import the policy references is mocked, and that mocked
/// values reach each position only with a shape that position accepts.
///
/// Mock values are followed through `else` fallbacks, `get` lookups and
/// quantifier bindings; a quantifier variable stands for every member of the
/// mocked collection. Absent or null attributes are left to evaluation.
pub fn typecheck(policy: &Policy, fixtures: &MockFixtures) -> Result<(), HarnessError> {
    for import in policy.imports() {
        if !fixtures.mock.contains_key(import) {
            return Err(HarnessError::MissingMockImport(import.to_string()));
        }
    }

    let registry = fixtures.registry();
    for rule in policy.rules() {
        let mut checker = Checker {
            registry: &registry,
            scope: Vec::new(),
        };
        checker.expect(&rule.expr, Shape::Boolean)?;
        checker.check(&rule.expr)?;
    }
    Ok(())
}

/// A mock value with the location it was read from.
#[derive(Clone, Debug)]
struct Mocked<'r> {
    import: &'r str,
    path: String,
    value: &'r Value,
}

impl<'r> Mocked<'r> {
    fn get(&self, path: &str, segments: &[Segment]) -> Option<Mocked<'r>> {
        let base: &'r Value = self.value;
        let value = base.lookup(segments)?;
        let path = if self.path.is_empty() || path.is_empty() || path.starts_with('[') {
            format!("{}{path}", self.path)
        } else {
            format!("{}.{path}", self.path)
        };
        Some(Mocked {
            import: self.import,
            path,
            value,
        })
    }

    fn members(&self) -> Vec<Mocked<'r>> {
        let base: &'r Value = self.value;
        match base {
            Value::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, value)| Mocked {
                    import: self.import,
                    path: format!("{}[{i}]", self.path),
                    value,
                })
                .collect(),
            Value::Map(map) => map
                .iter()
                .map(|(key, value)| Mocked {
                    import: self.import,
                    path: format!("{}[\"{key}\"]", self.path),
                    value,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

struct Checker<'p, 'r> {
    registry: &'r ImportRegistry,
    /// Quantifier bindings, innermost last.
    scope: Vec<(&'p str, Vec<Mocked<'r>>)>,
}

impl<'p, 'r> Checker<'p, 'r> {
    fn check(&mut self, e: &'p Expr) -> Result<(), HarnessError> {
        match e {
            Expr::Any(q) | Expr::All(q) | Expr::Filter(q) => return self.check_quantifier(q),
            Expr::In(_, haystack) | Expr::Contains(haystack, _) => {
                self.expect(haystack, Shape::Container)?
            }
            Expr::Length(arg) => self.expect(arg, Shape::Container)?,
            Expr::Not(arg) => self.expect(arg, Shape::Boolean)?,
            Expr::And(args) | Expr::Or(args) => {
                for arg in args {
                    self.expect(arg, Shape::Boolean)?;
                }
            }
            _ => {}
        }
        for child in e.children() {
            self.check(child)?;
        }
        Ok(())
    }

    fn check_quantifier(&mut self, q: &'p Quantifier) -> Result<(), HarnessError> {
        self.check(&q.over)?;
        self.expect(&q.over, Shape::Collection)?;
        let members: Vec<Mocked<'r>> = self
            .mocked(&q.over)?
            .iter()
            .flat_map(Mocked::members)
            .collect();

        let mark = self.scope.len();
        if let Some(key) = &q.key {
            self.scope.push((key.as_str(), Vec::new()));
        }
        self.scope.push((q.var.as_str(), members));
        let result = self
            .expect(&q.cond, Shape::Boolean)
            .and_then(|()| self.check(&q.cond));
        self.scope.truncate(mark);
        result
    }

    fn expect(&self, target: &'p Expr, shape: Shape) -> Result<(), HarnessError> {
        for mocked in self.mocked(target)? {
            if !mocked.value.is_undefined() && !shape.accepts(mocked.value) {
                return Err(HarnessError::MockTypeMismatch {
                    import: mocked.import.to_string(),
                    path: mocked.path,
                    expected: shape.describe(),
                    found: mocked.value.kind(),
                });
            }
        }
        Ok(())
    }

    /// The mock values `e` can evaluate to, where that is known without evaluating.
    fn mocked(&self, e: &'p Expr) -> Result<Vec<Mocked<'r>>, HarnessError> {
        let registry: &'r ImportRegistry = self.registry;
        Ok(match e {
            Expr::Attr { import, path } => {
                let Some(mock) = registry.get(import) else {
                    return Ok(Vec::new());
                };
                let segments = path::parse(path)?;
                mock.data
                    .lookup(&segments)
                    .map(|value| Mocked {
                        import: mock.name.as_str(),
                        path: path.clone(),
                        value,
                    })
                    .into_iter()
                    .collect()
            }
            Expr::Var(name) => self
                .scope
                .iter()
                .rev()
                .find(|(bound, _)| *bound == name.as_str())
                .map(|(_, mocked)| mocked.clone())
                .unwrap_or_default(),
            Expr::Get { of, path } => {
                let segments = path::parse(path)?;
                self.mocked(of)?
                    .iter()
                    .filter_map(|m| m.get(path, &segments))
                    .collect()
            }
            Expr::Else(value, fallback) => {
                let mut mocked = self.mocked(value)?;
                mocked.extend(self.mocked(fallback)?);
                mocked
            }
            _ => Vec::new(),
        })
    }
}
