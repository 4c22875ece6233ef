//! Deterministic JSON encoding used as the input to every hash in the chain.
//!
//! Relies on `serde_json::Value`'s default map representation (a
//! `BTreeMap`, since this workspace does not enable the `preserve_order`
//! feature) to get lexicographic key ordering for free, and on
//! `serde_json`'s default formatter to get a whitespace-free, non-escaping
//! UTF-8 serialization. Array order is never touched.

use serde_json::Value;

use crate::error::{CryptoError, CryptoResult};

/// Serializes `value` to its canonical UTF-8 byte form.
///
/// Structurally equal values always produce byte-identical output,
/// independent of the order in which an object's keys were inserted.
pub fn canonical_bytes(value: &Value) -> CryptoResult<Vec<u8>> {
    reject_non_finite(value)?;
    serde_json::to_vec(value).map_err(CryptoError::from)
}

fn reject_non_finite(value: &Value) -> CryptoResult<()> {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Err(CryptoError::Encoding(
                "NaN and Infinity are not encodable".to_string(),
            )),
            _ => Ok(()),
        },
        Value::Array(items) => {
            for item in items {
                reject_non_finite(item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            for v in map.values() {
                reject_non_finite(v)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
