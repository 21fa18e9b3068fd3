//! Field kinds and their UI constraints and coercion rules.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::data::field::FieldError;

/// The fixed set of value kinds a field can have.
///
/// The wire name of each kind is its lowercase identifier, e.g. `"int32"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Bool,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
}

/// Which kind of control renders a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Free text input.
    Text,
    /// Checkable control.
    Checkbox,
    /// Numeric input honoring [`Constraints::min`], [`Constraints::max`] and [`Constraints::step`].
    Number,
}

/// Increment of a numeric control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Whole numbers only.
    Integer,
    /// Arbitrary fractional values.
    Any,
}

/// Display constraints of a field kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Constraints {
    pub control: Control,
    /// Inclusive lower bound.
    pub min: Option<i128>,
    /// Inclusive upper bound.
    pub max: Option<i128>,
    pub step: Option<Step>,
}

impl Constraints {
    const fn plain(control: Control) -> Self {
        Self {
            control,
            min: None,
            max: None,
            step: None,
        }
    }

    const fn integer(min: i128, max: i128) -> Self {
        Self {
            control: Control::Number,
            min: Some(min),
            max: Some(max),
            step: Some(Step::Integer),
        }
    }

    const fn float() -> Self {
        Self {
            control: Control::Number,
            min: None,
            max: None,
            step: Some(Step::Any),
        }
    }

    /// Whether `n` lies within the bounds.
    pub fn contains(&self, n: i128) -> bool {
        self.min.is_none_or(|min| n >= min) && self.max.is_none_or(|max| n <= max)
    }
}

/// Raw state read back from a rendered control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInput {
    /// Text content of an input.
    Text(String),
    /// Checked state of a checkbox.
    Checked(bool),
}

/// Failure to turn a [`RawInput`] into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoerceError {
    #[error("`{raw}` is not a valid {kind} value")]
    Invalid { kind: FieldKind, raw: String },
    #[error("`{raw}` is out of range for {kind} ({min}..={max})")]
    OutOfRange {
        kind: FieldKind,
        raw: String,
        min: i128,
        max: i128,
    },
    #[error("a checkbox cannot hold a {kind} value")]
    InputMismatch { kind: FieldKind },
}

impl FieldKind {
    /// Every kind, in declaration order.
    pub const ALL: [FieldKind; 14] = [
        FieldKind::String,
        FieldKind::Bool,
        FieldKind::Int,
        FieldKind::Int8,
        FieldKind::Int16,
        FieldKind::Int32,
        FieldKind::Int64,
        FieldKind::Uint,
        FieldKind::Uint8,
        FieldKind::Uint16,
        FieldKind::Uint32,
        FieldKind::Uint64,
        FieldKind::Float32,
        FieldKind::Float64,
    ];

    /// The wire identifier of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Int8 => "int8",
            FieldKind::Int16 => "int16",
            FieldKind::Int32 => "int32",
            FieldKind::Int64 => "int64",
            FieldKind::Uint => "uint",
            FieldKind::Uint8 => "uint8",
            FieldKind::Uint16 => "uint16",
            FieldKind::Uint32 => "uint32",
            FieldKind::Uint64 => "uint64",
            FieldKind::Float32 => "float32",
            FieldKind::Float64 => "float64",
        }
    }

    /// Display constraints for this kind.
    ///
    /// `int` and `uint` are treated as 64-bit wide.
    pub fn constraints(&self) -> Constraints {
        match self {
            FieldKind::String => Constraints::plain(Control::Text),
            FieldKind::Bool => Constraints::plain(Control::Checkbox),
            FieldKind::Int8 => Constraints::integer(i8::MIN as i128, i8::MAX as i128),
            FieldKind::Int16 => Constraints::integer(i16::MIN as i128, i16::MAX as i128),
            FieldKind::Int32 => Constraints::integer(i32::MIN as i128, i32::MAX as i128),
            FieldKind::Int | FieldKind::Int64 => {
                Constraints::integer(i64::MIN as i128, i64::MAX as i128)
            }
            FieldKind::Uint8 => Constraints::integer(0, u8::MAX as i128),
            FieldKind::Uint16 => Constraints::integer(0, u16::MAX as i128),
            FieldKind::Uint32 => Constraints::integer(0, u32::MAX as i128),
            FieldKind::Uint | FieldKind::Uint64 => Constraints::integer(0, u64::MAX as i128),
            FieldKind::Float32 | FieldKind::Float64 => Constraints::float(),
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, FieldKind::Float32 | FieldKind::Float64)
    }

    /// Coerce a raw control state into the typed value for this kind.
    pub fn coerce(&self, raw: &RawInput) -> Result<Value, CoerceError> {
        match (self, raw) {
            (FieldKind::String, RawInput::Text(s)) => Ok(Value::String(s.clone())),
            (FieldKind::String, RawInput::Checked(_)) => {
                Err(CoerceError::InputMismatch { kind: *self })
            }
            (FieldKind::Bool, RawInput::Checked(b)) => Ok(Value::Bool(*b)),
            (FieldKind::Bool, RawInput::Text(s)) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(self.invalid(s)),
            },
            (_, RawInput::Checked(_)) => Err(CoerceError::InputMismatch { kind: *self }),
            (kind, RawInput::Text(s)) if kind.is_float() => {
                let f = s.trim().parse::<f64>().map_err(|_| self.invalid(s))?;
                Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| self.invalid(s))
            }
            (_, RawInput::Text(s)) => self.coerce_integer(s),
        }
    }

    fn coerce_integer(&self, raw: &str) -> Result<Value, CoerceError> {
        let n = raw.trim().parse::<i128>().map_err(|_| self.invalid(raw))?;
        let constraints = self.constraints();
        if !constraints.contains(n) {
            return Err(CoerceError::OutOfRange {
                kind: *self,
                raw: raw.to_string(),
                min: constraints.min.unwrap_or(i128::MIN),
                max: constraints.max.unwrap_or(i128::MAX),
            });
        }
        // Bounds were checked above, one of the two conversions always fits.
        let number = match i64::try_from(n) {
            Ok(i) => Number::from(i),
            Err(_) => Number::from(u64::try_from(n).map_err(|_| self.invalid(raw))?),
        };
        Ok(Value::Number(number))
    }

    fn invalid(&self, raw: &str) -> CoerceError {
        CoerceError::Invalid {
            kind: *self,
            raw: raw.to_string(),
        }
    }

    /// Initial control state for a catalog value.
    pub fn initial_input(&self, value: &Value) -> RawInput {
        match self {
            FieldKind::Bool => RawInput::Checked(value.as_bool().unwrap_or(false)),
            _ => RawInput::Text(match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            }),
        }
    }

    /// Default value of the kind, used when no current value is known.
    pub fn zero_value(&self) -> Value {
        match self {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Bool => Value::Bool(false),
            kind if kind.is_float() => Value::from(0.0),
            _ => Value::from(0),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldKind {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| FieldError::UnknownKind {
                path: String::new(),
                kind: s.to_string(),
            })
    }
}
