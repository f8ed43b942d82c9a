//! Typed cell values.
//!
//! A [`Value`] is hashable so generalized quasi-identifier tuples can key a
//! hash map directly. Reals hash and compare by a canonical bit pattern:
//! `-0.0` equals `0.0` and every NaN equals every other NaN.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Declared type of a dataset column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Date,
}

impl ColumnType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Date => "date",
        }
    }

    /// Whether bucketing by a numeric width applies to this type.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single cell.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    /// Build a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The column type this value satisfies, or `None` for null.
    #[must_use]
    pub const fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::Int(_) => Some(ColumnType::Integer),
            Self::Real(_) => Some(ColumnType::Real),
            Self::Text(_) => Some(ColumnType::Text),
            Self::Date(_) => Some(ColumnType::Date),
        }
    }

    /// Whether the value may be stored in a column of type `ty`.
    ///
    /// Null fits every column.
    #[must_use]
    pub fn fits(&self, ty: ColumnType) -> bool {
        self.column_type().is_none_or(|own| own == ty)
    }

    /// Numeric view used by aggregates. Text and dates have none.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short label for the kind of value, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
        }
    }

    /// Decode a JSON cell into a value of the declared column type.
    ///
    /// Integers accept integral floats and numeric strings; reals accept
    /// integers and numeric strings; text accepts numbers and booleans
    /// (rendered as written); dates accept `YYYY-MM-DD` strings.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch when the cell cannot be decoded.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn from_json(json: &serde_json::Value, ty: ColumnType) -> Result<Self, String> {
        use serde_json::Value as J;

        match (json, ty) {
            (J::Null, _) => Ok(Self::Null),
            (J::Number(n), ColumnType::Integer) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                        .map(|f| f as i64)
                })
                .map(Self::Int)
                .ok_or_else(|| format!("{n} is not an integer")),
            (J::String(s), ColumnType::Integer) => s
                .trim()
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|e| format!("'{s}' is not an integer: {e}")),
            (J::Number(n), ColumnType::Real) => n
                .as_f64()
                .map(Self::Real)
                .ok_or_else(|| format!("{n} is not a real")),
            (J::String(s), ColumnType::Real) => s
                .trim()
                .parse::<f64>()
                .map(Self::Real)
                .map_err(|e| format!("'{s}' is not a real: {e}")),
            (J::String(s), ColumnType::Text) => Ok(Self::Text(s.clone())),
            (J::Number(n), ColumnType::Text) => Ok(Self::Text(n.to_string())),
            (J::Bool(b), ColumnType::Text) => Ok(Self::Text(b.to_string())),
            (J::String(s), ColumnType::Date) => Self::parse_date(s),
            (other, ty) => Err(format!("cannot read {other} as {ty}")),
        }
    }

    /// Parse a `YYYY-MM-DD` date.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse failure.
    pub fn parse_date(s: &str) -> Result<Self, String> {
        NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Self::Date)
            .map_err(|e| format!("'{s}' is not a date: {e}"))
    }

    fn canonical_bits(v: f64) -> u64 {
        if v == 0.0 {
            0.0_f64.to_bits()
        } else if v.is_nan() {
            f64::NAN.to_bits()
        } else {
            v.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Real(a), Self::Real(b)) => Self::canonical_bits(*a) == Self::canonical_bits(*b),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Int(v) => v.hash(state),
            Self::Real(v) => Self::canonical_bits(*v).hash(state),
            Self::Text(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
        }
    }
}

impl Value {
    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Int(_) => 1,
            Self::Real(_) => 2,
            Self::Text(_) => 3,
            Self::Date(_) => 4,
        }
    }
}

/// Total order for deterministic output: nulls first, then by variant, then
/// by value. Reals order by their canonical bits' `total_cmp`.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => f64::from_bits(Self::canonical_bits(*a))
                .total_cmp(&f64::from_bits(Self::canonical_bits(*b))),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Date(v) => write!(f, "{}", v.format(DATE_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Real(v) => serializer.serialize_f64(*v),
            Self::Text(v) => serializer.serialize_str(v),
            Self::Date(v) => serializer.collect_str(&v.format(DATE_FORMAT)),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
