//! Equality and ordering over dynamically typed document values.
//!
//! Filters use structural equality where numbers compare by numeric value, so `1` and
//! `1.0` are equal. Sorting first decides one [`SortMode`] for the whole column: natural
//! ordering when every present value shares a comparable type, lexical ordering of the
//! values' string forms otherwise. Picking the mode per column keeps the comparator a total
//! order even when a column mixes types.

use std::{cmp::Ordering, collections::HashMap};

use serde_json::{Number, Value};

use crate::query::SortDirection;

/// Type-erased, comparable view of a document value.
#[derive(Debug)]
enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(&'a Number),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(value) => Comparable::Bool(*value),
            Value::Number(value) => Comparable::Number(value),
            Value::String(value) => Comparable::String(value),
            Value::Array(values) => Comparable::Array(
                values
                    .iter()
                    .map(Comparable::from)
                    .collect()
            ),
            Value::Object(map) => Comparable::Map(
                map
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect()
            ),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => numbers_equal(a, b),
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

fn numbers_equal(a: &Number, b: &Number) -> bool {
    compare_numbers(a, b) == Ordering::Equal
}

/// Exact numeric view of a JSON number.
#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i128),
    Float(f64),
}

impl From<&Number> for Numeric {
    fn from(number: &Number) -> Self {
        if let Some(n) = number.as_i64() {
            Numeric::Int(n.into())
        } else if let Some(n) = number.as_u64() {
            Numeric::Int(n.into())
        } else {
            Numeric::Float(number.as_f64().unwrap_or(f64::NAN))
        }
    }
}

/// Orders two numbers by their exact value.
///
/// Integers never pass through `f64`, so values above 2^53 keep their order and an
/// integer only equals a float holding exactly the same value.
fn compare_numbers(a: &Number, b: &Number) -> Ordering {
    match (Numeric::from(a), Numeric::from(b)) {
        (Numeric::Int(a), Numeric::Int(b)) => a.cmp(&b),
        (Numeric::Int(a), Numeric::Float(b)) => compare_int_float(a, b),
        (Numeric::Float(a), Numeric::Int(b)) => compare_int_float(b, a).reverse(),
        (Numeric::Float(a), Numeric::Float(b)) => a.total_cmp(&b),
    }
}

fn compare_int_float(int: i128, float: f64) -> Ordering {
    // Every integer lies in [-2^63, 2^64).
    const LOWER: f64 = -9_223_372_036_854_775_808.0;
    const UPPER: f64 = 18_446_744_073_709_551_616.0;

    if float.is_nan() || float >= UPPER {
        return Ordering::Less;
    }
    if float < LOWER {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i128)) {
        Ordering::Equal => 0.0_f64.total_cmp(&(float - whole)),
        other => other,
    }
}

/// Structural equality used by filter clauses.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    Comparable::from(left) == Comparable::from(right)
}

/// How values of one column are compared while sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Every present value is a number.
    Numeric,
    /// Every present value is a string.
    Text,
    /// Every present value is a boolean.
    Boolean,
    /// Mixed or non-comparable values; compare their string forms.
    Lexical,
}

impl SortMode {
    /// Picks the mode for a column from its present, non-null values.
    pub fn for_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        let mut mode = None;

        for value in values {
            let this = match value {
                Value::Null => continue,
                Value::Number(_) => SortMode::Numeric,
                Value::String(_) => SortMode::Text,
                Value::Bool(_) => SortMode::Boolean,
                Value::Array(_) | Value::Object(_) => return SortMode::Lexical,
            };

            match mode {
                None => mode = Some(this),
                Some(current) if current != this => return SortMode::Lexical,
                Some(_) => {}
            }
        }

        mode.unwrap_or(SortMode::Lexical)
    }

    /// Compares two present, non-null values under this mode.
    pub fn compare(self, left: &Value, right: &Value) -> Ordering {
        match (self, left, right) {
            (SortMode::Numeric, Value::Number(a), Value::Number(b)) => compare_numbers(a, b),
            (SortMode::Text, Value::String(a), Value::String(b)) => a.cmp(b),
            (SortMode::Boolean, Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => lexical(left).cmp(&lexical(right)),
        }
    }
}

fn lexical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Compares two possibly missing field values for an ordered read.
///
/// Missing and null values sort first when ascending and last when descending; present
/// values are compared under `mode` and reversed for descending order.
pub fn compare_fields(
    left: Option<&Value>,
    right: Option<&Value>,
    mode: SortMode,
    direction: &SortDirection,
) -> Ordering {
    let left = left.filter(|v| !v.is_null());
    let right = right.filter(|v| !v.is_null());

    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => match direction {
            SortDirection::Asc => Ordering::Less,
            SortDirection::Desc => Ordering::Greater,
        },
        (Some(_), None) => match direction {
            SortDirection::Asc => Ordering::Greater,
            SortDirection::Desc => Ordering::Less,
        },
        (Some(a), Some(b)) => match direction {
            SortDirection::Asc => mode.compare(a, b),
            SortDirection::Desc => mode.compare(b, a),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_compare_by_value() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!(-3), &json!(-3)));
        assert!(!values_equal(&json!(1), &json!(2)));
        assert!(!values_equal(&json!(1), &json!("1")));
    }

    #[test]
    fn nested_values_compare_structurally() {
        assert!(values_equal(
            &json!({ "a": [1, { "b": null }] }),
            &json!({ "a": [1.0, { "b": null }] })
        ));
        assert!(!values_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!values_equal(&json!({ "a": 1 }), &json!({ "a": 1, "b": 2 })));
    }

    #[test]
    fn mode_follows_column_types() {
        assert_eq!(SortMode::for_values([&json!(1), &json!(2.5)]), SortMode::Numeric);
        assert_eq!(SortMode::for_values([&json!("a"), &Value::Null]), SortMode::Text);
        assert_eq!(SortMode::for_values([&json!(true)]), SortMode::Boolean);
        assert_eq!(SortMode::for_values([&json!(1), &json!("a")]), SortMode::Lexical);
        assert_eq!(SortMode::for_values([&json!([1])]), SortMode::Lexical);
    }

    #[test]
    fn numeric_mode_is_not_lexical() {
        assert_eq!(SortMode::Numeric.compare(&json!(9), &json!(10)), Ordering::Less);
        assert_eq!(SortMode::Lexical.compare(&json!(9), &json!(10)), Ordering::Greater);
    }

    #[test]
    fn large_integers_keep_their_order() {
        let big = json!(9_007_199_254_740_993u64);
        let small = json!(9_007_199_254_740_992u64);

        assert_eq!(SortMode::Numeric.compare(&big, &small), Ordering::Greater);
        assert_eq!(SortMode::Numeric.compare(&json!(i64::MAX), &json!(u64::MAX)), Ordering::Less);
        assert_eq!(SortMode::Numeric.compare(&json!(-1), &json!(u64::MAX)), Ordering::Less);
        assert!(!values_equal(&big, &small));
    }

    #[test]
    fn integers_equal_only_exactly_matching_floats() {
        assert!(!values_equal(&json!(9_007_199_254_740_993u64), &json!(9_007_199_254_740_992.0)));
        assert!(values_equal(&json!(9_007_199_254_740_992u64), &json!(9_007_199_254_740_992.0)));
        assert!(values_equal(&json!(-4), &json!(-4.0)));

        assert_eq!(SortMode::Numeric.compare(&json!(2), &json!(2.5)), Ordering::Less);
        assert_eq!(SortMode::Numeric.compare(&json!(-2), &json!(-2.5)), Ordering::Greater);
        assert_eq!(SortMode::Numeric.compare(&json!(1.5), &json!(1)), Ordering::Greater);
        assert_eq!(SortMode::Numeric.compare(&json!(u64::MAX), &json!(1e20)), Ordering::Less);
        assert_eq!(SortMode::Numeric.compare(&json!(i64::MIN), &json!(-1e19)), Ordering::Greater);
    }

    #[test]
    fn missing_values_go_first_ascending_and_last_descending() {
        let present = json!(1);

        assert_eq!(
            compare_fields(None, Some(&present), SortMode::Numeric, &SortDirection::Asc),
            Ordering::Less
        );
        assert_eq!(
            compare_fields(None, Some(&present), SortMode::Numeric, &SortDirection::Desc),
            Ordering::Greater
        );
        assert_eq!(
            compare_fields(Some(&Value::Null), None, SortMode::Numeric, &SortDirection::Desc),
            Ordering::Equal
        );
    }
}
