//! Partition routing for outbound records.

use std::hash::{Hash, Hasher};

/// Computes a partition for a key using consistent hashing, so every
/// decision for a given user lands on the same partition.
pub fn partition_hash(key: &str, num_partitions: i32) -> i32 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    let hash = hasher.finish();
    (hash % num_partitions as u64) as i32
}
