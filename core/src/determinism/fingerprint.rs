use crate::catalog::model::ScenarioDefinition;
use crate::determinism::json_canonical;
use crate::error::CoreResult;
use sha2::{Digest, Sha256};
use ulid::Ulid;

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

pub fn catalog_fingerprint(def: &ScenarioDefinition) -> CoreResult<String> {
    let bytes = json_canonical::to_canonical_bytes(def)?;
    Ok(sha256_hex(&bytes))
}

/// Identifier for one mounted scenario instance.
pub fn session_id_ulid() -> String {
    format!("s_{}", Ulid::new())
}
