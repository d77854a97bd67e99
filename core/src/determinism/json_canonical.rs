use crate::error::{CoreError, CoreResult};
use serde::Serialize;
use serde_json::{Map, Value};

// Canonical form used for fingerprints:
// - object keys sorted lexicographically at every depth
// - compact separators
// - integers only; a float in scenario data is rejected
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> CoreResult<Vec<u8>> {
    let canonical = canonicalize(serde_json::to_value(value)?)?;
    Ok(serde_json::to_vec(&canonical)?)
}

fn canonicalize(v: Value) -> CoreResult<Value> {
    Ok(match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Map::new();
            for (k, vv) in entries {
                out.insert(k, canonicalize(vv)?);
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(
            arr.into_iter()
                .map(canonicalize)
                .collect::<CoreResult<Vec<_>>>()?,
        ),
        Value::Number(n) if !(n.is_i64() || n.is_u64()) => {
            return Err(CoreError::InvalidCatalog(format!(
                "non-integer number {} in canonical JSON",
                n
            )))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_are_sorted_at_every_depth() {
        let value = json!({"b": 1, "a": {"d": 2, "c": [ {"z": 0, "y": 1} ]}});
        let bytes = to_canonical_bytes(&value).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"a":{"c":[{"y":1,"z":0}],"d":2},"b":1}"#
        );
    }

    #[test]
    fn floats_are_rejected() {
        assert!(to_canonical_bytes(&json!({"ratio": 0.5})).is_err());
    }
}
