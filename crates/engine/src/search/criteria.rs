//! Search criteria over projected record fields

use planb_core::{Val, ValType};
use std::cmp::Ordering;
use std::fmt;

/// Field of a stored record that can be projected and filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Entity name
    Key,
    /// Effective time as a [`Val::Date`] in milliseconds
    ///
    /// Dates carry milliseconds only, so in `Nanosecond` stores the
    /// sub-millisecond part is truncated both in projected rows and when
    /// conditions on this field are evaluated. Use
    /// [`TemporalStore::get_state`](crate::TemporalStore::get_state) or
    /// [`TemporalStore::history`](crate::TemporalStore::history) for the exact
    /// time.
    EffectiveTime,
    /// Kind of the stored value as a [`Val::String`], e.g. `"string"`
    ValueType,
    /// Stored value
    Value,
}

impl Field {
    /// Every field, in projection order
    pub const ALL: [Field; 4] = [Field::Key, Field::EffectiveTime, Field::ValueType, Field::Value];

    /// Field name as used in criteria
    pub fn name(self) -> &'static str {
        match self {
            Field::Key => "key",
            Field::EffectiveTime => "effective_time",
            Field::ValueType => "value_type",
            Field::Value => "value",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison applied by a [`Condition`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Field equals the operand
    Equals,
    /// Field differs from the operand
    NotEquals,
    /// Field orders before the operand
    LessThan,
    /// Field orders before or equal to the operand
    LessThanOrEqual,
    /// Field orders after the operand
    GreaterThan,
    /// Field orders after or equal to the operand
    GreaterThanOrEqual,
    /// Text field contains the operand text
    Contains,
    /// Field is null
    IsNull,
    /// Field is not null
    IsNotNull,
}

/// One predicate on one field
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Field tested
    pub field: Field,
    /// Comparison
    pub operator: Operator,
    /// Right hand side; ignored by the null tests
    pub operand: Val,
}

impl Condition {
    /// `field <operator> operand`
    pub fn new(field: Field, operator: Operator, operand: impl Into<Val>) -> Self {
        Condition {
            field,
            operator,
            operand: operand.into(),
        }
    }

    /// `field == operand`
    pub fn equals(field: Field, operand: impl Into<Val>) -> Self {
        Self::new(field, Operator::Equals, operand)
    }

    /// `field is null`
    pub fn is_null(field: Field) -> Self {
        Self::new(field, Operator::IsNull, Val::Null)
    }

    /// Whether `value` satisfies this condition
    ///
    /// Values of different kinds are compared after converting the operand to
    /// the kind of the field. Incomparable pairs only satisfy
    /// [`Operator::NotEquals`].
    pub fn matches(&self, value: &Val) -> bool {
        match self.operator {
            Operator::IsNull => value.is_null(),
            Operator::IsNotNull => !value.is_null(),
            Operator::Contains => match (value.as_str(), self.operand_text()) {
                (Some(text), Some(needle)) => text.contains(needle.as_str()),
                _ => false,
            },
            Operator::NotEquals => self.ordering(value) != Some(Ordering::Equal),
            op => match self.ordering(value) {
                Some(ord) => match op {
                    Operator::Equals => ord == Ordering::Equal,
                    Operator::LessThan => ord == Ordering::Less,
                    Operator::LessThanOrEqual => ord != Ordering::Greater,
                    Operator::GreaterThan => ord == Ordering::Greater,
                    _ => ord != Ordering::Less,
                },
                None => false,
            },
        }
    }

    fn ordering(&self, value: &Val) -> Option<Ordering> {
        value.compare(&self.operand).or_else(|| {
            let operand = self.operand.coerce(value.val_type()).ok()?;
            value.compare(&operand)
        })
    }

    fn operand_text(&self) -> Option<String> {
        let text = self.operand.coerce(ValType::String).ok()?;
        text.as_str().map(str::to_owned)
    }
}

/// Restriction of a search to one name and a set of conditions
///
/// Conditions are combined with AND; no conditions match every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchCriteria {
    /// Only scan versions of this name
    pub name: Option<Val>,
    /// Conditions every returned record satisfies
    pub conditions: Vec<Condition>,
}

impl SearchCriteria {
    /// Criteria matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Criteria matching every version of `name`
    pub fn for_name(name: impl Into<Val>) -> Self {
        SearchCriteria {
            name: Some(name.into()),
            conditions: Vec::new(),
        }
    }

    /// Add a condition
    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}
