//! Hash Engine
//!
//! Canonical serialization plus BLAKE3 digest. Structurally equal values hash
//! identically regardless of map insertion order: object keys are emitted in
//! sorted order and no insignificant whitespace is written.

use crate::error::HashError;
use crate::types::{AttributeMap, Hash};
use blake3::Hasher;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Encode any serializable value into its canonical byte form
///
/// Fails with `HashError::Serialization` when the value has no JSON
/// representation (e.g. a map with non-string keys).
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, HashError> {
    let value = serde_json::to_value(value)?;
    let mut out = Vec::with_capacity(128);
    write_canonical(&value, &mut out)?;
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut Vec<u8>) -> Result<(), HashError> {
    match value {
        Value::Object(map) => {
            // Sort explicitly; the map may preserve insertion order
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(&map[key], out)?;
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        scalar => serde_json::to_writer(&mut *out, scalar)?,
    }
    Ok(())
}

/// Compute the canonical hash of a value
pub fn canonical_hash<T: Serialize + ?Sized>(value: &T) -> Result<Hash, HashError> {
    let bytes = canonical_bytes(value)?;
    Ok(compute_hash(&bytes))
}

/// Hash only the named attributes of a view
///
/// Names absent from the view are skipped, so a field set that mentions an
/// attribute the backend never returned hashes the same as one that doesn't.
pub fn canonical_hash_subset(
    view: &AttributeMap,
    fields: &BTreeSet<String>,
) -> Result<Hash, HashError> {
    let subset: AttributeMap = view
        .iter()
        .filter(|(k, _)| fields.contains(*k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    canonical_hash(&subset)
}

/// Compute a generic hash of arbitrary data
pub fn compute_hash(data: &[u8]) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hex::encode(hasher.finalize().as_bytes())
}
