/// Lead identity helpers.
///
/// A lead id is an opaque token that must survive a round trip through the
/// board widget as the tail of a card label, so it may not contain
/// whitespace. Freshly generated ids are 8 lowercase hex chars.
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new lead id (8 hex chars).
/// Uses an atomic counter for intra-process uniqueness combined with a
/// nanosecond timestamp, hashed via SHA-256 for uniform distribution.
pub fn generate_id() -> String {
    use sha2::{Digest, Sha256};
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let ts = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut hasher = Sha256::new();
    hasher.update(seq.to_le_bytes());
    hasher.update(ts.to_le_bytes());
    hex::encode(&hasher.finalize()[..4])
}

/// Generate an id that is not in `taken`.
pub fn generate_unique_id(taken: &HashSet<String>) -> String {
    loop {
        let id = generate_id();
        if !taken.contains(&id) {
            return id;
        }
    }
}

/// Why an id cannot travel through a card label.
pub fn id_problem(id: &str) -> Option<&'static str> {
    if id.is_empty() {
        Some("id is empty")
    } else if id.chars().any(char::is_whitespace) {
        Some("id contains whitespace")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_id_distinct() {
        let ids: HashSet<String> = (0..200).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn test_generate_unique_id_avoids_taken() {
        let taken: HashSet<String> = (0..50).map(|_| generate_id()).collect();
        let id = generate_unique_id(&taken);
        assert!(!taken.contains(&id));
    }

    #[test]
    fn test_id_problem() {
        assert_eq!(id_problem("a1b2c3d4"), None);
        assert_eq!(id_problem(""), Some("id is empty"));
        assert_eq!(id_problem("a1 b2"), Some("id contains whitespace"));
    }
}
