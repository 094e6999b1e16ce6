//! Declarative filter expressions.
//!
//! An expression is a JSON tree:
//!
//! - `true` / `false`: literal result
//! - `"path.to.field"`: truthiness of the field
//! - `["path", op, literal]`: comparison, `op` one of
//!   `== === != !== < > <= >=`
//! - `{"and": [..]}` / `{"or": [..]}`: all / any of the sub-expressions
//! - `{"not": expr}`: negation
//!
//! Any other shape is rejected with [`PipelineError::InvalidExpression`]
//! when it is evaluated.

use crate::error::{PipelineError, Result};
use crate::path::FieldPath;
use serde_json::{Value, json};
use std::cmp::Ordering;

/// Evaluate `expr` against one record.
pub fn evaluate(expr: &Value, record: &Value) -> Result<bool> {
    match expr {
        Value::Bool(b) => Ok(*b),
        Value::String(path) => Ok(truthy(FieldPath::parse(path).get(record))),
        Value::Array(parts) => match parts.as_slice() {
            [Value::String(path), Value::String(op), literal] => {
                let lhs = FieldPath::parse(path).get(record);
                compare(lhs, op, literal).ok_or_else(|| PipelineError::invalid_expression(expr))
            }
            _ => Err(PipelineError::invalid_expression(expr)),
        },
        Value::Object(map) if map.len() == 1 => {
            if let Some(Value::Array(items)) = map.get("and") {
                for item in items {
                    if !evaluate(item, record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            } else if let Some(Value::Array(items)) = map.get("or") {
                for item in items {
                    if evaluate(item, record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            } else if let Some(inner) = map.get("not") {
                Ok(!evaluate(inner, record)?)
            } else {
                Err(PipelineError::invalid_expression(expr))
            }
        }
        _ => Err(PipelineError::invalid_expression(expr)),
    }
}

/// `{"and": [..]}`
pub fn and(items: impl IntoIterator<Item = Value>) -> Value {
    json!({ "and": items.into_iter().collect::<Vec<_>>() })
}

/// `{"or": [..]}`
pub fn or(items: impl IntoIterator<Item = Value>) -> Value {
    json!({ "or": items.into_iter().collect::<Vec<_>>() })
}

/// `{"not": expr}`
pub fn not(expr: Value) -> Value {
    json!({ "not": expr })
}

/// `[path, op, literal]`
pub fn cmp(path: &str, op: &str, literal: impl Into<Value>) -> Value {
    json!([path, op, literal.into()])
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// `None` for an unknown operator.
fn compare(lhs: Option<&Value>, op: &str, rhs: &Value) -> Option<bool> {
    let result = match op {
        "==" => loose_eq(lhs, rhs),
        "===" => strict_eq(lhs, rhs),
        "!=" => !loose_eq(lhs, rhs),
        "!==" => !strict_eq(lhs, rhs),
        "<" => ordering(lhs, rhs).is_some_and(Ordering::is_lt),
        ">" => ordering(lhs, rhs).is_some_and(Ordering::is_gt),
        "<=" => ordering(lhs, rhs).is_some_and(Ordering::is_le),
        ">=" => ordering(lhs, rhs).is_some_and(Ordering::is_ge),
        _ => return None,
    };
    Some(result)
}

fn strict_eq(lhs: Option<&Value>, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(a), b) => a == b,
        (None, _) => false,
    }
}

/// Loose equality: a missing field equals `null`, and mixed scalars
/// (`10 == "10"`, `true == 1`) compare as numbers.
fn loose_eq(lhs: Option<&Value>, rhs: &Value) -> bool {
    let Some(lhs) = lhs else {
        return rhs.is_null();
    };
    match (lhs, rhs) {
        (Value::Null, b) => b.is_null(),
        (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (a, b) if is_scalar(a) && is_scalar(b) => {
            matches!((to_number(a), to_number(b)), (Some(x), Some(y)) if x == y)
        }
        (a, b) => strict_eq(Some(a), b),
    }
}

/// Strings compare lexicographically; other scalar pairs compare as numbers.
fn ordering(lhs: Option<&Value>, rhs: &Value) -> Option<Ordering> {
    match (lhs?, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (a, b) if is_scalar(a) && is_scalar(b) => to_number(a)?.partial_cmp(&to_number(b)?),
        _ => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::Number(_) | Value::String(_) | Value::Bool(_))
}

/// Numeric reading of a scalar. Blank strings read as `0`; strings that are
/// not decimal numbers have no reading.
fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => {
            let text = s.trim();
            if text.is_empty() {
                Some(0.0)
            } else if text.bytes().all(|b| b.is_ascii_digit() || b"+-.eE".contains(&b)) {
                text.parse().ok()
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn traffic() -> Vec<Value> {
        vec![
            json!({"day": 1, "pv": 2246, "uv": 1345, "bool": false}),
            json!({"day": 2, "pv": 5730, "uv": 2550, "bool": true}),
            json!({"day": 3, "pv": 4567, "uv": 3656, "bool": false}),
            json!({"day": 4, "pv": 4679, "uv": 2366, "bool": true}),
            json!({"day": 5, "pv": 2904, "uv": 4832, "bool": false}),
        ]
    }

    #[test]
    fn test_nested_and_not() {
        let expr = and([
            json!(true),
            cmp("pv", ">=", 3000),
            cmp("uv", ">=", 2000),
            not(cmp("day", ">", 3)),
        ]);
        let results: Vec<bool> = traffic()
            .iter()
            .map(|r| evaluate(&expr, r).unwrap())
            .collect();
        assert_eq!(results, vec![false, true, true, false, false]);
    }

    #[test]
    fn test_or_any() {
        let expr = or([cmp("pv", "<", 2500), "bool".into()]);
        let results: Vec<bool> = traffic()
            .iter()
            .map(|r| evaluate(&expr, r).unwrap())
            .collect();
        assert_eq!(results, vec![true, true, false, true, false]);
    }

    #[test]
    fn test_path_truthiness() {
        let record = json!({"zero": 0, "empty": "", "list": [], "name": "x"});
        assert!(!evaluate(&json!("zero"), &record).unwrap());
        assert!(!evaluate(&json!("empty"), &record).unwrap());
        assert!(!evaluate(&json!("missing"), &record).unwrap());
        assert!(evaluate(&json!("list"), &record).unwrap());
        assert!(evaluate(&json!("name"), &record).unwrap());
    }

    #[test]
    fn test_equality_operators() {
        let record = json!({"a": 1, "s": "x", "n": null});
        assert!(evaluate(&cmp("a", "==", 1.0), &record).unwrap());
        assert!(evaluate(&cmp("a", "===", 1), &record).unwrap());
        assert!(evaluate(&cmp("s", "!=", "y"), &record).unwrap());
        assert!(!evaluate(&cmp("s", "!==", "x"), &record).unwrap());
        assert!(evaluate(&cmp("missing", "==", Value::Null), &record).unwrap());
        assert!(!evaluate(&cmp("missing", "===", Value::Null), &record).unwrap());
        assert!(evaluate(&cmp("n", "===", Value::Null), &record).unwrap());
    }

    #[test]
    fn test_loose_equality_coerces_scalars() {
        let record = json!({"pv": 10, "flag": true, "code": "007", "word": "ten"});
        assert!(evaluate(&cmp("pv", "==", "10"), &record).unwrap());
        assert!(!evaluate(&cmp("pv", "===", "10"), &record).unwrap());
        assert!(!evaluate(&cmp("pv", "!=", "10.0"), &record).unwrap());
        assert!(evaluate(&cmp("pv", "!==", "10"), &record).unwrap());
        assert!(evaluate(&cmp("flag", "==", 1), &record).unwrap());
        assert!(!evaluate(&cmp("flag", "===", 1), &record).unwrap());
        assert!(evaluate(&cmp("code", "==", 7), &record).unwrap());
        assert!(!evaluate(&cmp("code", "==", "7"), &record).unwrap());
        assert!(!evaluate(&cmp("word", "==", 10), &record).unwrap());
        assert!(!evaluate(&cmp("pv", "==", Value::Null), &record).unwrap());
    }

    #[test]
    fn test_ordering_coerces_mixed_scalars() {
        let record = json!({"pv": 10, "s": "5"});
        assert!(evaluate(&cmp("s", "<", 10), &record).unwrap());
        assert!(evaluate(&cmp("pv", ">=", "9.5"), &record).unwrap());
        assert!(evaluate(&cmp("pv", ">", true), &record).unwrap());
        // both strings: lexicographic
        assert!(!evaluate(&cmp("s", "<", "10"), &record).unwrap());
    }

    #[test]
    fn test_ordering_on_mismatched_types_is_false() {
        let record = json!({"s": "abc", "a": 3});
        assert!(!evaluate(&cmp("s", "<", 10), &record).unwrap());
        assert!(!evaluate(&cmp("missing", ">=", 0), &record).unwrap());
        assert!(evaluate(&cmp("s", "<", "abd"), &record).unwrap());
        assert!(evaluate(&cmp("a", "<=", 3), &record).unwrap());
    }

    #[test]
    fn test_empty_and_or() {
        let record = json!({});
        assert!(evaluate(&and([]), &record).unwrap());
        assert!(!evaluate(&or([]), &record).unwrap());
    }

    #[test]
    fn test_invalid_shapes_fail() {
        let record = json!({"a": 1});
        for expr in [
            json!(5),
            json!(null),
            json!(["a", "=~", 1]),
            json!(["a", ">"]),
            json!({"xor": [true]}),
            json!({"and": true}),
            json!({"and": [], "or": []}),
        ] {
            let err = evaluate(&expr, &record).unwrap_err();
            assert!(matches!(err, PipelineError::InvalidExpression { .. }), "{expr}");
        }
    }

    #[test]
    fn test_invalid_nested_shape_fails_when_reached() {
        let record = json!({"a": 1});
        let expr = and([json!(false), json!(42)]);
        // short-circuit: the bad branch is never reached
        assert!(!evaluate(&expr, &record).unwrap());
        let expr = and([json!(true), json!(42)]);
        assert!(evaluate(&expr, &record).is_err());
    }
}
