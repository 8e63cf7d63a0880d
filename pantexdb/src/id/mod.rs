// Identifier generation for documents saved without an `_id`

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Strategy used to mint new document identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// 64-char hex SHA-256 of the current timestamp and a random value.
    #[default]
    Hash,
    Ulid,
    Uuid,
    Nanoid,
}

/// Generate a fresh identifier using the given strategy.
///
/// Uniqueness is probabilistic only; nothing here checks the collection
/// for an existing file with the same name.
pub fn generate(strategy: IdStrategy) -> String {
    match strategy {
        IdStrategy::Hash => hash_id(),
        IdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
        IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
        IdStrategy::Nanoid => nanoid::nanoid!(),
    }
}

fn hash_id() -> String {
    let timestamp = Utc::now().timestamp_millis().to_string();
    let random: f64 = rand::random();

    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(random.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check that an identifier can safely be used as a file stem inside a
/// collection directory.
pub fn is_valid(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && !id.contains(['/', '\\', '\0'])
}
