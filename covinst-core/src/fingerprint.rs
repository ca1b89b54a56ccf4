//! Content fingerprint of a coverage map
//!
//! The hash is the SHA-256 of the canonical JSON of the map, tagged with the
//! coverage schema version and without any previous hash. The same tagged
//! payload seeds the runtime object in the bootstrap.

use crate::coverage::FileCoverage;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Schema tag mixed into every fingerprint
pub const COVERAGE_SCHEMA: &str = "covinst-coverage-v1";

/// Key under which the schema tag is stored in the hashed payload
pub const SCHEMA_KEY: &str = "_coverageSchema";

/// Canonical payload of a snapshot: serialized map, schema tag added, hash removed
pub fn tagged_payload(snapshot: &FileCoverage, schema: &str) -> Result<Value, serde_json::Error> {
    let mut value = serde_json::to_value(snapshot)?;
    if let Value::Object(map) = &mut value {
        map.remove("hash");
        map.insert(SCHEMA_KEY.to_string(), Value::String(schema.to_string()));
    }
    Ok(value)
}

/// Fingerprint a snapshot under the current schema
pub fn compute(snapshot: &FileCoverage) -> Result<String, serde_json::Error> {
    compute_with_schema(snapshot, COVERAGE_SCHEMA)
}

pub fn compute_with_schema(snapshot: &FileCoverage, schema: &str) -> Result<String, serde_json::Error> {
    let payload = tagged_payload(snapshot, schema)?;
    let bytes = serde_json::to_vec(&payload)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}
