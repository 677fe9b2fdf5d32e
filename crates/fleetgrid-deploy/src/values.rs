//! Value merging for per-cluster overrides.

use serde_json::Value;

/// Merge override values over base values.
///
/// Shallow map merge: override keys take precedence wholesale, nested
/// objects are replaced, not merged. A non-object override replaces the
/// base entirely; a null override leaves the base untouched.
pub fn merge_values(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in override_map {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        (_, Value::Null) => base.clone(),
        (_, other) => other.clone(),
    }
}
