/* src/server/core/rust/src/patch.rs */

use serde_json::Value;

/// Deep-merge `patch` into `target`.
///
/// Objects merge key by key; arrays, strings and every other value replace
/// what was there. A non-object patch replaces the whole target.
pub fn merge(target: &mut Value, patch: Value) {
  match (target, patch) {
    (Value::Object(existing), Value::Object(incoming)) => {
      for (key, value) in incoming {
        match existing.get_mut(&key) {
          Some(slot) if slot.is_object() && value.is_object() => merge(slot, value),
          _ => {
            existing.insert(key, value);
          }
        }
      }
    }
    (target, patch) => *target = patch,
  }
}

/// Merge into a copy, leaving `base` untouched.
pub fn merged(base: &Value, patch: Value) -> Value {
  let mut out = base.clone();
  merge(&mut out, patch);
  out
}
