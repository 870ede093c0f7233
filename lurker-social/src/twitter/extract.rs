//! Shape-agnostic helpers for upstream JSON.
//!
//! Upstream payloads change shape often (v1.1 arrays, v2 `data` envelopes,
//! GraphQL timelines), so nothing here assumes a schema. [`to_item_list`]
//! flattens whatever arrived into a sequence of item objects, and
//! [`find_key`] locates a field anywhere in a value.
use crate::error::{Result, SocialError};
use serde_json::Value;
use std::collections::VecDeque;

/// Field that carries an item's identity.
pub const ID_KEY: &str = "id";

/// Envelope keys that wrap item lists, in lookup order.
const ENVELOPE_KEYS: &[&str] = &["list", "data", "items", "entries"];

/// Flatten a single object, an array, or an enveloped payload into items.
///
/// - arrays yield their object elements in order; nested arrays are flattened
///   in place and scalars are dropped
/// - an object with a direct `id` field is a single item
/// - an object carrying an envelope key (`list`, `data`, `items`, `entries`)
///   yields the normalization of that key's value
/// - any other object is a single item if an `id` is reachable inside it,
///   otherwise nothing
///
/// Never fails; unrecognized input produces an empty vector.
///
/// ```
/// use lurker_social::twitter::extract::to_item_list;
/// use serde_json::json;
///
/// let items = to_item_list(&json!({ "data": [{ "id": "1" }, { "id": "2" }] }));
/// assert_eq!(items.len(), 2);
/// assert!(to_item_list(&json!({ "meta": { "result_count": 0 } })).is_empty());
/// ```
pub fn to_item_list(input: &Value) -> Vec<Value> {
    let mut out = Vec::new();
    collect_items(input, &mut out);
    out
}

fn collect_items(v: &Value, out: &mut Vec<Value>) {
    match v {
        Value::Array(arr) => {
            for el in arr {
                match el {
                    Value::Object(_) => out.push(el.clone()),
                    Value::Array(_) => collect_items(el, out),
                    _ => {}
                }
            }
        }
        Value::Object(map) => {
            if map.contains_key(ID_KEY) {
                out.push(v.clone());
                return;
            }
            if let Some(inner) = ENVELOPE_KEYS.iter().find_map(|k| map.get(*k)) {
                collect_items(inner, out);
                return;
            }
            if find_key(v, ID_KEY).is_some() {
                out.push(v.clone());
            }
        }
        _ => {}
    }
}

/// Breadth-first search for the first field literally named `key`.
///
/// Shallower fields win over deeper ones. Within a level, object fields are
/// visited in map iteration order and array elements by index. Returns `None`
/// when the key does not occur anywhere.
///
/// ```
/// use lurker_social::twitter::extract::find_key;
/// use serde_json::json;
///
/// let v = json!({ "a": [{ "b": { "id": 7 } }] });
/// assert_eq!(find_key(&v, "id"), Some(&json!(7)));
/// assert_eq!(find_key(&v, "missing"), None);
/// ```
pub fn find_key<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    let mut queue: VecDeque<&'a Value> = VecDeque::new();
    queue.push_back(obj);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                if let Some(found) = map.get(key) {
                    return Some(found);
                }
                queue.extend(map.values());
            }
            Value::Array(arr) => queue.extend(arr.iter()),
            _ => {}
        }
    }
    None
}

/// Like [`find_key`] for callers that must treat absence as an error.
pub fn require_key<'a>(obj: &'a Value, key: &str) -> Result<&'a Value> {
    find_key(obj, key).ok_or_else(|| SocialError::KeyNotFound {
        key: key.to_string(),
    })
}

/// Identity of an item: its first reachable `id`, as a string.
///
/// Strings are used verbatim and numbers in decimal form; other non-null
/// values use their compact JSON text. `null` and `""` count as no id.
pub fn item_id(item: &Value) -> Option<String> {
    match find_key(item, ID_KEY)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn find_key_at_any_depth() {
        let shallow = json!({ "id": "1" });
        let deep = json!({ "a": { "b": [ { "c": { "d": { "id": "deep" } } } ] } });
        assert_eq!(find_key(&shallow, "id"), Some(&json!("1")));
        assert_eq!(find_key(&deep, "id"), Some(&json!("deep")));
    }

    #[test]
    fn find_key_prefers_shallowest_match() {
        let v = json!({
            "core": { "user": { "id": "user-1" } },
            "legacy": { "id": "tweet-1" },
            "nested": [ { "x": { "y": { "id": "too-deep" } } } ]
        });
        // "legacy.id" and "core.user.id" differ in depth: legacy is depth 1.
        assert_eq!(find_key(&v, "id"), Some(&json!("tweet-1")));
    }

    #[test]
    fn find_key_absent_or_scalar_input() {
        assert_eq!(find_key(&json!({ "a": [1, 2, { "b": null }] }), "id"), None);
        assert_eq!(find_key(&json!(42), "id"), None);
        assert_eq!(find_key(&json!(null), "id"), None);
        assert_eq!(find_key(&json!([]), "id"), None);
    }

    #[test]
    fn find_key_returns_null_values_as_found() {
        assert_eq!(find_key(&json!({ "id": null }), "id"), Some(&Value::Null));
    }

    #[test]
    fn require_key_reports_missing_key() {
        let err = require_key(&json!({ "text": "hi" }), "id").unwrap_err();
        assert!(matches!(err, SocialError::KeyNotFound { ref key } if key == "id"));
    }

    #[test]
    fn single_object_is_one_item() {
        let item = json!({ "id": "42", "text": "hello" });
        assert_eq!(to_item_list(&item), vec![item]);
    }

    #[test]
    fn flat_array_is_unchanged() {
        let arr = json!([{ "id": "1" }, { "id": "2" }, { "text": "no id" }]);
        assert_eq!(to_item_list(&arr), arr.as_array().unwrap().clone());
    }

    #[test]
    fn mixed_arrays_are_flattened_in_order() {
        let v = json!([{ "id": "1" }, [{ "id": "2" }, 7, [{ "id": "3" }]], "x", null]);
        let ids: Vec<_> = to_item_list(&v).iter().filter_map(item_id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn envelopes_are_unwrapped() {
        let list = json!({ "list": [{ "id": "a" }], "next": "cursor" });
        let data = json!({ "data": { "id": "b", "text": "single" } });
        let entries = json!({ "entries": [{ "entryId": "tweet-1", "content": { "id": "c" } }] });
        assert_eq!(to_item_list(&list).len(), 1);
        assert_eq!(item_id(&to_item_list(&data)[0]).as_deref(), Some("b"));
        assert_eq!(item_id(&to_item_list(&entries)[0]).as_deref(), Some("c"));
    }

    #[test]
    fn direct_id_wins_over_envelope_keys() {
        let v = json!({ "id": "x", "data": [{ "id": "1" }, { "id": "2" }] });
        let items = to_item_list(&v);
        assert_eq!(items.len(), 1);
        assert_eq!(item_id(&items[0]).as_deref(), Some("x"));
    }

    #[test]
    fn object_without_nested_array_is_empty() {
        assert!(to_item_list(&json!({ "meta": { "count": 0 } })).is_empty());
        assert!(to_item_list(&json!({ "data": null })).is_empty());
        assert!(to_item_list(&json!({ "list": "oops" })).is_empty());
        assert!(to_item_list(&json!("scalar")).is_empty());
    }

    #[test]
    fn object_with_deep_id_is_an_item() {
        let v = json!({ "tweet": { "legacy": { "id": "9" } } });
        assert_eq!(to_item_list(&v), vec![v]);
    }

    #[test]
    fn item_id_stringifies() {
        assert_eq!(item_id(&json!({ "id": 42 })).as_deref(), Some("42"));
        assert_eq!(item_id(&json!({ "id": "42" })).as_deref(), Some("42"));
        assert_eq!(item_id(&json!({ "id": true })).as_deref(), Some("true"));
        assert_eq!(item_id(&json!({ "id": null })), None);
        assert_eq!(item_id(&json!({ "id": "" })), None);
        assert_eq!(item_id(&json!({ "text": "x" })), None);
    }
}
