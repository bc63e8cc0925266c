use sha2::{Digest, Sha256};

/// Builds a node or edge id from a kind prefix and a 1-based sequence number.
pub fn generate_id(prefix: &str, seq: u32) -> String {
    format!("{}{}", prefix, seq)
}

/// Derives the idempotency key of a trigger subscription.
///
/// The digest is the lowercase hex SHA-256 of `"{user_id}:{workflow_id}:{version}:{local_id}"`,
/// so recompiling the same workflow for the same user always yields the same instance id.
pub fn hash_trigger_instance(
    user_id: &str,
    workflow_id: &str,
    version: &str,
    local_id: &str,
) -> String {
    let material = format!("{}:{}:{}:{}", user_id, workflow_id, version, local_id);
    hex::encode(Sha256::digest(material.as_bytes()))
}
