//! Folds behind the `sum`, `count` and `avg` shortcuts.
//!
//! Accumulators are JSON values. Integer arithmetic stays integral while
//! it fits in `i64`; anything else goes through `f64`. A non-numeric
//! operand (a missing field, a string) poisons the accumulator to `null`.

use crate::path::FieldPath;
use serde_json::{Number, Value};

/// Accumulator fold: `(accumulator, record, original_index) -> accumulator'`.
pub type Fold<'a> = dyn FnMut(Value, &Value, usize) -> Value + 'a;

/// `acc + record[path]`
pub fn sum(path: FieldPath) -> impl FnMut(Value, &Value, usize) -> Value {
    move |acc, record, _| add(&acc, path.get_or_null(record))
}

/// `acc + 1`
pub fn count() -> impl FnMut(Value, &Value, usize) -> Value {
    |acc, _, _| add(&acc, &Value::from(1))
}

/// `(acc * record[path] + index) / (index + 1)`, using the record's index
/// in the level's input rather than a per-group counter.
///
/// This is not a true running mean and is kept exactly as written.
pub fn avg(path: FieldPath) -> impl FnMut(Value, &Value, usize) -> Value {
    move |acc, record, index| {
        let (Some(acc), Some(x)) = (acc.as_f64(), path.get_or_null(record).as_f64()) else {
            return Value::Null;
        };
        let index = index as f64;
        float((acc * x + index) / (index + 1.0))
    }
}

pub(crate) fn add(lhs: &Value, rhs: &Value) -> Value {
    let (Value::Number(a), Value::Number(b)) = (lhs, rhs) else {
        return Value::Null;
    };
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64())
        && let Some(total) = x.checked_add(y)
    {
        return Value::from(total);
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => float(x + y),
        _ => Value::Null,
    }
}

fn float(x: f64) -> Value {
    Number::from_f64(x).map_or(Value::Null, Value::Number)
}
