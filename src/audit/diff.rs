//! Diff generation for audit logging
//!
//! Produces one line per changed leaf between two JSON values, with the path
//! to the leaf written in dotted form (`balances.global.net.u_a.u_b`).

use serde_json::Value;

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Format a JSON value for a diff line
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() > 50 => {
            let head: String = s.chars().take(47).collect();
            format!("\"{}...\"", head)
        }
        Value::String(s) => format!("\"{}\"", s),
        Value::Array(arr) => format!("[{} items]", arr.len()),
        Value::Object(obj) => format!("{{{} fields}}", obj.len()),
        other => other.to_string(),
    }
}

/// List every nested change between `before` and `after`
///
/// Objects are compared key by key, recursing into nested objects. Arrays of
/// equal length are compared element-wise; otherwise only their lengths are
/// reported.
pub fn generate_detailed_diff(before: &Value, after: &Value, prefix: &str) -> Vec<String> {
    let mut changes = Vec::new();

    match (before, after) {
        (Value::Object(before_obj), Value::Object(after_obj)) => {
            for (key, before_val) in before_obj {
                let path = join(prefix, key);
                match after_obj.get(key) {
                    Some(after_val) if before_val == after_val => {}
                    Some(after_val) => {
                        changes.extend(generate_detailed_diff(before_val, after_val, &path))
                    }
                    None => changes.push(format!(
                        "{}: {} -> (removed)",
                        path,
                        format_value(before_val)
                    )),
                }
            }
            for (key, after_val) in after_obj {
                if !before_obj.contains_key(key) {
                    changes.push(format!(
                        "{}: (added) -> {}",
                        join(prefix, key),
                        format_value(after_val)
                    ));
                }
            }
        }
        (Value::Array(before_arr), Value::Array(after_arr))
            if before_arr.len() == after_arr.len() =>
        {
            for (i, (b, a)) in before_arr.iter().zip(after_arr).enumerate() {
                if b != a {
                    changes.extend(generate_detailed_diff(b, a, &format!("{}[{}]", prefix, i)));
                }
            }
        }
        _ if before != after => changes.push(format!(
            "{}: {} -> {}",
            prefix,
            format_value(before),
            format_value(after)
        )),
        _ => {}
    }

    changes
}
