use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256;

/// Number of digest bytes kept when deriving a node ID from its key.
pub const NODE_ID_BYTES: usize = 20;

/// Unique identifier of a node on the network.
///
/// Derived nodes use the lowercase hex of the first 20 bytes of
/// `sha256(node public key)`; operator supplied IDs are taken verbatim.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn from_public_key(key: &VerifyingKey) -> Self {
        let digest = sha256(key.as_bytes());
        NodeId(hex::encode(&digest[..NODE_ID_BYTES]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[test]
    fn test_node_id_from_public_key_is_stable() {
        let key = SigningKey::from_bytes(&[3u8; 32]).verifying_key();
        let a = NodeId::from_public_key(&key);
        let b = NodeId::from_public_key(&key);

        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), NODE_ID_BYTES * 2);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_distinct_keys_give_distinct_ids() {
        let a = NodeId::from_public_key(&SigningKey::from_bytes(&[1u8; 32]).verifying_key());
        let b = NodeId::from_public_key(&SigningKey::from_bytes(&[2u8; 32]).verifying_key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_node_id_display_and_from_str() {
        let id: NodeId = "peer-A".into();
        assert_eq!(format!("{}", id), "peer-A");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"peer-A\"");
    }
}
