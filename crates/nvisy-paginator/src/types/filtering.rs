//! Filter predicates for paginated queries.
//!
//! Clients send filters as loosely typed "where" objects such as
//! `{"status": "active", "age": {"gte": 18}}`. They are parsed and validated
//! here once, at the boundary; the paginator passes the resulting [`Filter`]
//! through to the record source untouched.

use std::cmp::Ordering;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

/// Comparison operator of a single filter condition.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString
)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FilterOp {
    /// Field equals the operand.
    Equals,
    /// Field differs from the operand.
    Not,
    /// Field is greater than the operand.
    Gt,
    /// Field is greater than or equal to the operand.
    Gte,
    /// Field is less than the operand.
    Lt,
    /// Field is less than or equal to the operand.
    Lte,
    /// Field equals one of the operands.
    In,
    /// Field equals none of the operands.
    NotIn,
    /// Text field contains the operand.
    Contains,
    /// Text field starts with the operand.
    StartsWith,
    /// Text field ends with the operand.
    EndsWith,
}

impl FilterOp {
    /// Returns a description of the operand this operator expects, or `None`
    /// when the operand is valid.
    fn check_operand(self, operand: &Value) -> Option<&'static str> {
        match self {
            Self::Equals | Self::Not => None,
            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                (!(operand.is_number() || operand.is_string())).then_some("a number or a string")
            }
            Self::In | Self::NotIn => (!operand.is_array()).then_some("an array"),
            Self::Contains | Self::StartsWith | Self::EndsWith => {
                (!operand.is_string()).then_some("a string")
            }
        }
    }

    /// Evaluates the operator against a field value.
    fn eval(self, field: &Value, operand: &Value) -> bool {
        match self {
            Self::Equals => json_eq(field, operand),
            Self::Not => !json_eq(field, operand),
            Self::Gt => compare_json(field, operand) == Some(Ordering::Greater),
            Self::Gte => matches!(
                compare_json(field, operand),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Lt => compare_json(field, operand) == Some(Ordering::Less),
            Self::Lte => matches!(
                compare_json(field, operand),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::In => operand
                .as_array()
                .is_some_and(|items| items.iter().any(|item| json_eq(field, item))),
            Self::NotIn => operand
                .as_array()
                .is_some_and(|items| !items.iter().any(|item| json_eq(field, item))),
            Self::Contains => text_pair(field, operand).is_some_and(|(f, o)| f.contains(o)),
            Self::StartsWith => text_pair(field, operand).is_some_and(|(f, o)| f.starts_with(o)),
            Self::EndsWith => text_pair(field, operand).is_some_and(|(f, o)| f.ends_with(o)),
        }
    }
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
pub struct Condition {
    /// Field name; nested fields are separated with dots.
    pub field: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Operand the field is compared with.
    pub value: Value,
}

impl Condition {
    /// Creates a new condition.
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Evaluates the condition against a JSON record.
    pub fn matches(&self, record: &Value) -> bool {
        let field = lookup_field(record, &self.field).unwrap_or(&Value::Null);
        self.op.eval(field, &self.value)
    }
}

/// Reasons a filter could not be parsed.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    /// The filter is not valid JSON.
    #[error("filter is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The filter root is not an object.
    #[error("filter must be an object, got {0}")]
    NotAnObject(&'static str),

    /// A field name is empty.
    #[error("filter contains an empty field name")]
    EmptyField,

    /// An operator is not recognized.
    #[error("unknown operator '{op}' on field '{field}'")]
    UnknownOperator {
        /// Field the operator was applied to.
        field: String,
        /// The unrecognized operator.
        op: String,
    },

    /// An operand has the wrong type for its operator.
    #[error("operator '{op}' on field '{field}' expects {expected}")]
    InvalidOperand {
        /// Field the operator was applied to.
        field: String,
        /// The operator.
        op: FilterOp,
        /// Description of the expected operand.
        expected: &'static str,
    },
}

/// A conjunction of conditions; a record matches when all conditions hold.
///
/// The empty filter matches every record.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(transparent)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Creates a new empty filter.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition.
    #[inline]
    pub fn with(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::new(field, op, value));
        self
    }

    /// Adds an equality condition.
    #[inline]
    pub fn equals(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, FilterOp::Equals, value)
    }

    /// Parses a filter from a JSON "where" string.
    ///
    /// Single-quoted JSON (`{'status': 'active'}`) is accepted as well. An
    /// empty string yields the empty filter.
    pub fn parse(input: &str) -> Result<Self, FilterError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::default());
        }

        let value = match serde_json::from_str::<Value>(input) {
            Ok(value) => value,
            Err(error) if input.contains('\'') => {
                serde_json::from_str(&input.replace('\'', "\"")).map_err(|_| error)?
            }
            Err(error) => return Err(error.into()),
        };

        Self::from_value(value)
    }

    /// Builds a filter from a JSON "where" object.
    ///
    /// Each entry is either `field: value` (equality) or
    /// `field: { op: operand, ... }`. `null` yields the empty filter.
    pub fn from_value(value: Value) -> Result<Self, FilterError> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Self::from_map(map),
            other => Err(FilterError::NotAnObject(json_type_name(&other))),
        }
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, FilterError> {
        let mut conditions = Vec::with_capacity(map.len());

        for (field, value) in map {
            if field.is_empty() {
                return Err(FilterError::EmptyField);
            }

            let Value::Object(ops) = value else {
                conditions.push(Condition::new(field, FilterOp::Equals, value));
                continue;
            };

            for (op, operand) in ops {
                let op: FilterOp = op
                    .parse()
                    .map_err(|_| FilterError::UnknownOperator {
                        field: field.clone(),
                        op: op.clone(),
                    })?;

                if let Some(expected) = op.check_operand(&operand) {
                    return Err(FilterError::InvalidOperand {
                        field,
                        op,
                        expected,
                    });
                }

                conditions.push(Condition::new(field.clone(), op, operand));
            }
        }

        Ok(Self { conditions })
    }

    /// Returns the conditions.
    #[inline]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns whether any condition is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluates the filter against a JSON record.
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// Looks up a possibly dotted field path in a JSON record.
pub fn lookup_field<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(record, |value, segment| value.get(segment))
}

/// Compares two JSON scalars of the same kind.
///
/// Numbers compare numerically, strings lexicographically, booleans with
/// `false < true`. Mixed kinds, arrays and objects are incomparable.
pub fn compare_json(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_json(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn text_pair<'a>(field: &'a Value, operand: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((field.as_str()?, operand.as_str()?))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
