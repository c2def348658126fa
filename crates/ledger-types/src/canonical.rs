//! Deterministic byte encoding of JSON values.
//!
//! Canonical JSON is the byte string every hash in the ledger is computed
//! over. Two logically equal values — regardless of key order, or of
//! Unicode strings that differ only by normalization form — must canonicalize
//! to identical bytes across processes, architectures, and language runtimes.
//!
//! The encoding runs in two passes: `sanitize` walks the value tree and
//! normalizes strings, rejects non-finite numbers, and recurses into
//! objects/arrays; `to_canonical_bytes` then re-serializes with object keys
//! sorted and no inter-token whitespace.

use serde_json::{Map, Value};
use unicode_normalization::UnicodeNormalization;

use crate::error::{LedgerTypeError, LedgerTypeResult};

/// Normalizes a value into canonical form, then encodes it as compact,
/// key-sorted JSON bytes.
pub fn canonical_json_bytes(value: &Value) -> LedgerTypeResult<Vec<u8>> {
    let sanitized = sanitize(value)?;
    Ok(to_canonical_string(&sanitized).into_bytes())
}

/// As [`canonical_json_bytes`], but returns the intermediate string.
pub fn canonical_json_string(value: &Value) -> LedgerTypeResult<String> {
    let sanitized = sanitize(value)?;
    Ok(to_canonical_string(&sanitized))
}

fn sanitize(value: &Value) -> LedgerTypeResult<Value> {
    match value {
        Value::Null | Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if !f.is_finite() {
                    return Err(LedgerTypeError::NonFiniteFloat);
                }
            }
            Ok(value.clone())
        }
        Value::String(s) => Ok(Value::String(s.nfkc().collect::<String>())),
        Value::Array(items) => {
            let sanitized = items.iter().map(sanitize).collect::<LedgerTypeResult<_>>()?;
            Ok(Value::Array(sanitized))
        }
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (k, v) in map {
                let key = k.nfkc().collect::<String>();
                out.insert(key, sanitize(v)?);
            }
            Ok(Value::Object(out))
        }
    }
}

/// Serializes an already-sanitized value with sorted object keys and no
/// inter-token whitespace. `serde_json::Value`'s default `Map` is a
/// `BTreeMap` (the `preserve_order` feature is not enabled anywhere in this
/// workspace), so object iteration order is already ascending-by-key.
fn to_canonical_string(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut out = String::from("{");
            let mut first = true;
            for (k, v) in map {
                if !first {
                    out.push(',');
                }
                first = false;
                out.push_str(&serde_json::to_string(k).expect("string keys always serialize"));
                out.push(':');
                out.push_str(&to_canonical_string(v));
            }
            out.push('}');
            out
        }
        Value::Array(items) => {
            let mut out = String::from("[");
            let mut first = true;
            for item in items {
                if !first {
                    out.push(',');
                }
                first = false;
                out.push_str(&to_canonical_string(item));
            }
            out.push(']');
            out
        }
        // Scalars already serialize deterministically via serde_json.
        _ => serde_json::to_string(value).expect("sanitized scalar always serializes"),
    }
}
