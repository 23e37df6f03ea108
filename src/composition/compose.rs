use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::foundation::core::Value;
use crate::foundation::error::{CueError, CueResult};

/// Signature of a custom composition function.
pub type ComposeFn = dyn Fn(&[Value]) -> CueResult<Value> + Send + Sync;

/// Return the last (most recently added) value. Safe for any value type.
pub fn compose_last(values: &[Value]) -> CueResult<Value> {
    values
        .last()
        .cloned()
        .ok_or_else(|| CueError::composition("cannot compose an empty value list"))
}

/// Return the first (earliest added) value.
pub fn compose_first(values: &[Value]) -> CueResult<Value> {
    values
        .first()
        .cloned()
        .ok_or_else(|| CueError::composition("cannot compose an empty value list"))
}

/// Sum numbers, or equal-length vectors element-wise.
pub fn compose_sum(values: &[Value]) -> CueResult<Value> {
    let Some(first) = values.first() else {
        return Err(CueError::composition("cannot compose an empty value list"));
    };
    match first {
        Value::Number(_) => {
            let mut acc = 0.0;
            for v in values {
                match v {
                    Value::Number(n) => acc += n,
                    other => return Err(mixed_kinds("sum", first, other)),
                }
            }
            Ok(Value::Number(acc))
        }
        Value::Vector(head) => {
            let mut acc = vec![0.0; head.len()];
            for v in values {
                match v {
                    Value::Vector(xs) if xs.len() == acc.len() => {
                        for (a, x) in acc.iter_mut().zip(xs) {
                            *a += x;
                        }
                    }
                    Value::Vector(xs) => {
                        return Err(CueError::composition(format!(
                            "sum needs equal-length vectors, got {} and {}",
                            acc.len(),
                            xs.len()
                        )));
                    }
                    other => return Err(mixed_kinds("sum", first, other)),
                }
            }
            Ok(Value::Vector(acc))
        }
        other => Err(CueError::composition(format!(
            "sum needs numeric values, got {}",
            other.kind()
        ))),
    }
}

/// Average numbers, or equal-length vectors element-wise.
pub fn compose_mean(values: &[Value]) -> CueResult<Value> {
    let n = values.len() as f64;
    match compose_sum(values)? {
        Value::Number(total) => Ok(Value::Number(total / n)),
        Value::Vector(total) => Ok(Value::Vector(total.into_iter().map(|x| x / n).collect())),
        other => Err(CueError::composition(format!(
            "mean needs numeric values, got {}",
            other.kind()
        ))),
    }
}

fn mixed_kinds(op: &str, first: &Value, other: &Value) -> CueError {
    CueError::composition(format!(
        "{op} cannot mix {} and {} values",
        first.kind(),
        other.kind()
    ))
}

/// Reduction used by a timeline to merge simultaneous values for one key.
#[derive(Clone, Default)]
pub enum Compose {
    /// [`compose_last`]
    #[default]
    Last,
    /// [`compose_first`]
    First,
    /// [`compose_sum`]
    Sum,
    /// [`compose_mean`]
    Mean,
    /// Caller-supplied reduction over the ordered value list.
    Custom(Arc<ComposeFn>),
}

impl Compose {
    /// Wrap a closure as a [`Compose::Custom`] reduction.
    pub fn custom(f: impl Fn(&[Value]) -> CueResult<Value> + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Merge a non-empty, insertion-ordered value list into one value.
    pub fn apply(&self, values: &[Value]) -> CueResult<Value> {
        if values.is_empty() {
            return Err(CueError::composition("cannot compose an empty value list"));
        }
        match self {
            Self::Last => compose_last(values),
            Self::First => compose_first(values),
            Self::Sum => compose_sum(values),
            Self::Mean => compose_mean(values),
            Self::Custom(f) => f(values),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::First => "first",
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for Compose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Compose::{}", self.name())
    }
}

impl FromStr for Compose {
    type Err = CueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "first" => Ok(Self::First),
            "sum" => Ok(Self::Sum),
            "mean" | "avg" | "average" => Ok(Self::Mean),
            other => Err(CueError::not_found(format!(
                "no compose function named '{other}'"
            ))),
        }
    }
}

impl<'de> serde::Deserialize<'de> for Compose {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let name = String::deserialize(de)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/compose.rs"]
mod tests;
