//! Wire encoding: `0x`-prefixed hex byte strings and JSON transactions

use crate::error::{AuthError, Result};
use crate::types::{Hash, Transaction};

/// Render bytes as `0x`-prefixed lowercase hex
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parse hex with or without the `0x` prefix
pub fn from_prefixed_hex(s: &str) -> Result<Vec<u8>> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| AuthError::Serialization(format!("invalid hex {:?}: {}", s, e)))
}

/// Parse a 32-byte hash from hex
pub fn hash_from_hex(s: &str) -> Result<Hash> {
    let bytes = from_prefixed_hex(s)?;
    bytes.as_slice().try_into().map_err(|_| {
        AuthError::Serialization(format!("expected 32-byte hash, got {} bytes", bytes.len()))
    })
}

pub fn transaction_to_json(tx: &Transaction) -> Result<String> {
    serde_json::to_string(tx).map_err(|e| AuthError::Serialization(e.to_string()))
}

pub fn transaction_from_json(json: &str) -> Result<Transaction> {
    serde_json::from_str(json).map_err(|e| AuthError::Serialization(e.to_string()))
}

/// serde adapter for `Vec<u8>`
pub mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_prefixed_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::from_prefixed_hex(&s).map_err(D::Error::custom)
    }
}

/// serde adapter for `[u8; 32]`
pub mod hex_hash {
    use crate::types::Hash;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_prefixed_hex(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::hash_from_hex(&s).map_err(D::Error::custom)
    }
}

/// serde adapter for `Option<[u8; 32]>`
pub mod hex_hash_opt {
    use crate::types::Hash;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hash: &Option<Hash>, serializer: S) -> Result<S::Ok, S::Error> {
        match hash {
            Some(h) => serializer.serialize_some(&super::to_prefixed_hex(h)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Hash>, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        s.map(|s| super::hash_from_hex(&s).map_err(D::Error::custom)).transpose()
    }
}

/// serde adapter for `Vec<Vec<u8>>`
pub mod hex_bytes_list {
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(list: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(list.len()))?;
        for item in list {
            seq.serialize_element(&super::to_prefixed_hex(item))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| super::from_prefixed_hex(s).map_err(D::Error::custom))
            .collect()
    }
}
