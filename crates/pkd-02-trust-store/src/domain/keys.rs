//! # Trust Store Table Layout
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `a:` | actor url | `Actor` |
//! | `k:` | actor url, 0x00, key id | `KeyRecord` |
//! | `x:` | actor url, 0x00, aux id | `AuxDataRecord` |
//! | `f:` | domain | `SecondFactor` |

/// Key prefixes for the trust tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    /// Actor rows.
    Actor,
    /// Key rows, grouped by actor.
    Key,
    /// Aux data rows, grouped by actor.
    AuxData,
    /// Second-factor enrollments, by domain.
    SecondFactor,
}

impl KeyPrefix {
    /// Get the byte prefix for this key type.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            KeyPrefix::Actor => b"a:",
            KeyPrefix::Key => b"k:",
            KeyPrefix::AuxData => b"x:",
            KeyPrefix::SecondFactor => b"f:",
        }
    }

    fn key(&self, parts: &[&str]) -> Vec<u8> {
        let mut key = self.as_bytes().to_vec();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                key.push(0);
            }
            key.extend_from_slice(part.as_bytes());
        }
        key
    }

    /// Actor row.
    pub fn actor_key(actor: &str) -> Vec<u8> {
        KeyPrefix::Actor.key(&[actor])
    }

    /// All key rows of one actor.
    pub fn actor_keys_prefix(actor: &str) -> Vec<u8> {
        let mut key = KeyPrefix::Key.key(&[actor]);
        key.push(0);
        key
    }

    /// One key row.
    pub fn key_record_key(actor: &str, key_id: &str) -> Vec<u8> {
        KeyPrefix::Key.key(&[actor, key_id])
    }

    /// All aux rows of one actor.
    pub fn actor_aux_prefix(actor: &str) -> Vec<u8> {
        let mut key = KeyPrefix::AuxData.key(&[actor]);
        key.push(0);
        key
    }

    /// One aux row.
    pub fn aux_record_key(actor: &str, aux_id: &str) -> Vec<u8> {
        KeyPrefix::AuxData.key(&[actor, aux_id])
    }

    /// Second-factor row.
    pub fn second_factor_key(domain: &str) -> Vec<u8> {
        KeyPrefix::SecondFactor.key(&[domain])
    }
}

/// Fresh random key id (128 bits, base64url).
pub fn new_key_id() -> String {
    let mut bytes = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut bytes);
    pkd_crypto::b64_encode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_prefix_does_not_match_longer_actor() {
        let prefix = KeyPrefix::actor_keys_prefix("https://a.example/u/al");
        let other = KeyPrefix::key_record_key("https://a.example/u/alice", "id");
        assert!(!other.starts_with(&prefix));
        assert!(KeyPrefix::key_record_key("https://a.example/u/al", "id").starts_with(&prefix));
    }

    #[test]
    fn test_key_ids_are_unique() {
        assert_ne!(new_key_id(), new_key_id());
        assert_eq!(new_key_id().len(), 22);
    }
}
