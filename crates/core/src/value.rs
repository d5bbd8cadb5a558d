//! Scalar values stored by the engine
//!
//! This module defines:
//! - [`Val`]: closed tagged union of the thirteen scalar kinds
//! - [`ValType`]: the kind discriminator with its stable one-byte tag
//!
//! ## Type Rules
//!
//! - Different kinds are never equal: `Int(1) != Long(1)`
//! - Conversion between kinds is explicit, through [`Val::coerce`], and fails
//!   with [`Error::Encoding`] instead of substituting a default
//! - Float equality follows IEEE-754: `NaN != NaN`

use crate::error::{Error, Result};
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Kind of a [`Val`]
///
/// The discriminant is the tag byte written ahead of every encoded value and
/// must never change once data has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ValType {
    /// No value
    Null = 0,
    /// true / false
    Boolean = 1,
    /// 8-bit signed integer
    Byte = 2,
    /// 16-bit signed integer
    Short = 3,
    /// 32-bit signed integer
    Int = 4,
    /// 64-bit signed integer
    Long = 5,
    /// 32-bit float
    Float = 6,
    /// 64-bit float
    Double = 7,
    /// Milliseconds since epoch
    Date = 8,
    /// Milliseconds
    Duration = 9,
    /// UTF-8 text
    String = 10,
    /// UTF-8 error message
    Error = 11,
    /// Opaque bytes (binary or XML blobs)
    Binary = 12,
}

impl ValType {
    /// All kinds in tag order
    pub const ALL: [ValType; 13] = [
        ValType::Null,
        ValType::Boolean,
        ValType::Byte,
        ValType::Short,
        ValType::Int,
        ValType::Long,
        ValType::Float,
        ValType::Double,
        ValType::Date,
        ValType::Duration,
        ValType::String,
        ValType::Error,
        ValType::Binary,
    ];

    /// Tag byte
    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Resolve a tag byte
    pub fn from_tag(tag: u8) -> Option<ValType> {
        Self::ALL.get(tag as usize).copied()
    }

    /// Width of the payload for fixed-width kinds, `None` for text and binary
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            ValType::Null => Some(0),
            ValType::Boolean | ValType::Byte => Some(1),
            ValType::Short => Some(2),
            ValType::Int | ValType::Float => Some(4),
            ValType::Long | ValType::Double | ValType::Date | ValType::Duration => Some(8),
            ValType::String | ValType::Error | ValType::Binary => None,
        }
    }

    /// Human readable name
    pub fn name(self) -> &'static str {
        match self {
            ValType::Null => "null",
            ValType::Boolean => "boolean",
            ValType::Byte => "byte",
            ValType::Short => "short",
            ValType::Int => "integer",
            ValType::Long => "long",
            ValType::Float => "float",
            ValType::Double => "double",
            ValType::Date => "date",
            ValType::Duration => "duration",
            ValType::String => "string",
            ValType::Error => "error",
            ValType::Binary => "binary",
        }
    }

    fn is_integral(self) -> bool {
        matches!(
            self,
            ValType::Boolean
                | ValType::Byte
                | ValType::Short
                | ValType::Int
                | ValType::Long
                | ValType::Date
                | ValType::Duration
        )
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tagged scalar value: the content of one stored cell
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 8-bit signed integer
    Byte(i8),
    /// 16-bit signed integer
    Short(i16),
    /// 32-bit signed integer
    Int(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// Milliseconds since Unix epoch
    Date(i64),
    /// Duration in milliseconds
    Duration(i64),
    /// UTF-8 string
    String(String),
    /// Error message
    Error(String),
    /// Raw bytes
    Binary(Vec<u8>),
}

impl Val {
    /// Kind of this value
    pub fn val_type(&self) -> ValType {
        match self {
            Val::Null => ValType::Null,
            Val::Boolean(_) => ValType::Boolean,
            Val::Byte(_) => ValType::Byte,
            Val::Short(_) => ValType::Short,
            Val::Int(_) => ValType::Int,
            Val::Long(_) => ValType::Long,
            Val::Float(_) => ValType::Float,
            Val::Double(_) => ValType::Double,
            Val::Date(_) => ValType::Date,
            Val::Duration(_) => ValType::Duration,
            Val::String(_) => ValType::String,
            Val::Error(_) => ValType::Error,
            Val::Binary(_) => ValType::Binary,
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// Get as &str for String and Error values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::String(s) | Val::Error(s) => Some(s),
            _ => None,
        }
    }

    /// Integral view of boolean, integer, date and duration values
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Val::Boolean(b) => Some(i64::from(*b)),
            Val::Byte(v) => Some(i64::from(*v)),
            Val::Short(v) => Some(i64::from(*v)),
            Val::Int(v) => Some(i64::from(*v)),
            Val::Long(v) | Val::Date(v) | Val::Duration(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of every numeric kind
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Val::Float(v) => Some(f64::from(*v)),
            Val::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Convert this value to another kind
    ///
    /// Text is parsed, integers are range checked and floats must be integral
    /// to become integers. Null only converts to Null.
    pub fn coerce(&self, target: ValType) -> Result<Val> {
        if self.val_type() == target {
            return Ok(self.clone());
        }
        let fail = || Error::encoding(target, self);
        match target {
            ValType::Null => Err(fail()),
            ValType::Boolean => match self {
                Val::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(Val::Boolean(true)),
                    "false" => Ok(Val::Boolean(false)),
                    _ => Err(fail()),
                },
                other => other
                    .integral()
                    .map(|v| Val::Boolean(v != 0))
                    .ok_or_else(fail),
            },
            ValType::Byte => self
                .integral()
                .and_then(|v| i8::try_from(v).ok())
                .map(Val::Byte)
                .ok_or_else(fail),
            ValType::Short => self
                .integral()
                .and_then(|v| i16::try_from(v).ok())
                .map(Val::Short)
                .ok_or_else(fail),
            ValType::Int => self
                .integral()
                .and_then(|v| i32::try_from(v).ok())
                .map(Val::Int)
                .ok_or_else(fail),
            ValType::Long => self.integral().map(Val::Long).ok_or_else(fail),
            ValType::Float => self
                .floating()
                .map(|v| Val::Float(v as f32))
                .ok_or_else(fail),
            ValType::Double => self.floating().map(Val::Double).ok_or_else(fail),
            ValType::Date => match self {
                Val::String(s) => parse_date(s).map(Val::Date).ok_or_else(fail),
                Val::Long(v) | Val::Duration(v) => Ok(Val::Date(*v)),
                _ => Err(fail()),
            },
            ValType::Duration => match self {
                Val::String(s) => parse_duration(s).map(Val::Duration).ok_or_else(fail),
                Val::Long(v) | Val::Date(v) => Ok(Val::Duration(*v)),
                Val::Byte(_) | Val::Short(_) | Val::Int(_) => {
                    self.as_i64().map(Val::Duration).ok_or_else(fail)
                }
                _ => Err(fail()),
            },
            ValType::String => match self {
                Val::Null => Err(fail()),
                Val::Binary(b) => String::from_utf8(b.clone())
                    .map(Val::String)
                    .map_err(|_| fail()),
                Val::Error(s) => Ok(Val::String(s.clone())),
                other => Ok(Val::String(other.to_string())),
            },
            ValType::Error => match self {
                Val::Null => Err(fail()),
                other => other.coerce(ValType::String).map(|v| match v {
                    Val::String(s) => Val::Error(s),
                    other => other,
                }),
            },
            ValType::Binary => match self {
                Val::String(s) | Val::Error(s) => Ok(Val::Binary(s.as_bytes().to_vec())),
                _ => Err(fail()),
            },
        }
    }

    fn integral(&self) -> Option<i64> {
        match self {
            Val::String(s) => s.trim().parse::<i64>().ok(),
            Val::Float(v) => float_to_integral(f64::from(*v)),
            Val::Double(v) => float_to_integral(*v),
            other => other.as_i64(),
        }
    }

    fn floating(&self) -> Option<f64> {
        match self {
            Val::String(s) => s.trim().parse::<f64>().ok(),
            other => other.as_f64(),
        }
    }

    /// Order two values for predicate evaluation
    ///
    /// Numeric kinds compare numerically with each other (and with numeric
    /// text), text compares lexicographically, binary compares bytewise.
    /// Returns `None` for incomparable pairs.
    pub fn compare(&self, other: &Val) -> Option<Ordering> {
        let (left, right) = (self.val_type(), other.val_type());
        if left.is_integral() && right.is_integral() {
            return Some(self.as_i64()?.cmp(&other.as_i64()?));
        }
        match (self, other) {
            (Val::Null, Val::Null) => Some(Ordering::Equal),
            (Val::Null, _) | (_, Val::Null) => None,
            (Val::Binary(a), Val::Binary(b)) => Some(a.cmp(b)),
            (a, b) if a.as_str().is_some() && b.as_str().is_some() => {
                Some(a.as_str()?.cmp(b.as_str()?))
            }
            (a, b) => a.floating()?.partial_cmp(&b.floating()?),
        }
    }
}

fn float_to_integral(v: f64) -> Option<i64> {
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_date(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.timestamp_millis())
    })
}

fn parse_duration(text: &str) -> Option<i64> {
    let text = text.trim();
    text.strip_suffix("ms")
        .unwrap_or(text)
        .trim()
        .parse::<i64>()
        .ok()
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => Ok(()),
            Val::Boolean(v) => write!(f, "{v}"),
            Val::Byte(v) => write!(f, "{v}"),
            Val::Short(v) => write!(f, "{v}"),
            Val::Int(v) => write!(f, "{v}"),
            Val::Long(v) => write!(f, "{v}"),
            Val::Float(v) => write!(f, "{v}"),
            Val::Double(v) => write!(f, "{v}"),
            Val::Date(ms) => match DateTime::<Utc>::from_timestamp_millis(*ms) {
                Some(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => write!(f, "{ms}"),
            },
            Val::Duration(ms) => write!(f, "{ms}ms"),
            Val::String(s) | Val::Error(s) => f.write_str(s),
            Val::Binary(b) => f.write_str(&base64::engine::general_purpose::STANDARD.encode(b)),
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::String(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::String(s)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Boolean(b)
    }
}

impl From<i8> for Val {
    fn from(v: i8) -> Self {
        Val::Byte(v)
    }
}

impl From<i16> for Val {
    fn from(v: i16) -> Self {
        Val::Short(v)
    }
}

impl From<i32> for Val {
    fn from(v: i32) -> Self {
        Val::Int(v)
    }
}

impl From<i64> for Val {
    fn from(v: i64) -> Self {
        Val::Long(v)
    }
}

impl From<f32> for Val {
    fn from(v: f32) -> Self {
        Val::Float(v)
    }
}

impl From<f64> for Val {
    fn from(v: f64) -> Self {
        Val::Double(v)
    }
}

impl From<Vec<u8>> for Val {
    fn from(b: Vec<u8>) -> Self {
        Val::Binary(b)
    }
}

impl From<&[u8]> for Val {
    fn from(b: &[u8]) -> Self {
        Val::Binary(b.to_vec())
    }
}

impl From<()> for Val {
    fn from(_: ()) -> Self {
        Val::Null
    }
}
