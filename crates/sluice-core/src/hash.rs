use crate::id::ObjectId;

/// Kinds of content that get addressed by hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ObjectKind {
    Commit = 0x01,
}

/// Domain-separated BLAKE3 hash: "sluice\0" || kind || version || payload
pub fn content_hash(kind: ObjectKind, payload: &[u8]) -> ObjectId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"sluice\0");
    hasher.update(&[kind as u8]);
    hasher.update(&[1u8]); // version
    hasher.update(payload);
    let hash = hasher.finalize();
    ObjectId::from_bytes(*hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_hash() {
        let h1 = content_hash(ObjectKind::Commit, b"hello world");
        let h2 = content_hash(ObjectKind::Commit, b"hello world");
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_payloads_produce_different_hashes() {
        let h1 = content_hash(ObjectKind::Commit, b"data1");
        let h2 = content_hash(ObjectKind::Commit, b"data2");
        assert_ne!(h1, h2);
    }

    #[test]
    fn never_produces_zero_id_for_real_content() {
        assert!(!content_hash(ObjectKind::Commit, b"").is_zero());
    }
}
