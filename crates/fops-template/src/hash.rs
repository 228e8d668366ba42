use sha2::{Digest, Sha256};

use crate::template::Template;

/// Hash of a template's phase/step structure: canonical (key-sorted) JSON fed
/// through SHA-256. Snapshots record it so an audit can prove what structure a
/// technician was shown, independently of the version counter.
pub fn structure_hash(template: &Template) -> String {
    let v = serde_json::to_value(&template.phases).expect("template phases serializable");
    let canonical = sort_json(v);
    let bytes = serde_json::to_vec(&canonical).expect("json bytes");
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Recursively sort object keys for stable hashing.
fn sort_json(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new_map = serde_json::Map::new();
            for k in keys {
                let child = map.get(&k).cloned().unwrap_or(serde_json::Value::Null);
                new_map.insert(k, sort_json(child));
            }
            serde_json::Value::Object(new_map)
        }
        serde_json::Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}
