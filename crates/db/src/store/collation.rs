//! View key collation.
//!
//! Index keys are ordered the way CouchDB orders view keys:
//! `null < false < true < numbers < strings < arrays < objects`. Arrays and
//! objects compare element by element, then by length. Strings compare by
//! code point rather than by ICU collation.

use std::cmp::Ordering;

use serde_json::Value;

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// Compare two index keys.
pub fn compare_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                let ord = compare_keys(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Value::Object(xs), Value::Object(ys)) => {
            for ((kx, vx), (ky, vy)) in xs.iter().zip(ys) {
                let ord = kx.cmp(ky).then_with(|| compare_keys(vx, vy));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_order() {
        let ordered = [
            json!(null),
            json!(false),
            json!(true),
            json!(1),
            json!("a"),
            json!(["a"]),
            json!({}),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(compare_keys(&pair[0], &pair[1]), Ordering::Less);
        }
    }

    #[test]
    fn shorter_array_prefix_sorts_first() {
        assert_eq!(
            compare_keys(&json!(["page"]), &json!(["page", "2024"])),
            Ordering::Less
        );
    }

    #[test]
    fn object_sentinel_sorts_after_strings_in_arrays() {
        assert_eq!(
            compare_keys(&json!(["page", "2024"]), &json!(["page", {}])),
            Ordering::Less
        );
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(compare_keys(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_keys(&json!(1.5), &json!(1.5)), Ordering::Equal);
    }
}
