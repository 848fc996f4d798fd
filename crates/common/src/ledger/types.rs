use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::LedgerError;

/// Length of a hex encoded content address
pub const ITEM_HASH_LEN: usize = 64;
/// Length of a hex encoded address, without the `0x` prefix
const ADDRESS_HEX_LEN: usize = 40;

/// Content address of a post or a stored blob
///
/// 64 lowercase hex characters of a SHA-256 digest.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemHash(String);

impl ItemHash {
    /// Hash raw bytes
    pub fn digest(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ItemHash {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = s.len() == ITEM_HASH_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(LedgerError::InvalidHash(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for ItemHash {
    type Error = LedgerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ItemHash> for String {
    fn from(hash: ItemHash) -> Self {
        hash.0
    }
}

impl fmt::Debug for ItemHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemHash({})", self.0)
    }
}

impl fmt::Display for ItemHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Wallet-style account address, `0x` followed by 40 lowercase hex chars
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    /// Parses mixed-case input and normalizes it to lowercase
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("0x")
            .ok_or_else(|| LedgerError::InvalidAddress(s.to_string()))?;
        if hex.len() != ADDRESS_HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(LedgerError::InvalidAddress(s.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = LedgerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who a write is for, who signed it, and where it goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub owner: Address,
    pub signer: Address,
    pub channel: String,
}

impl Envelope {
    pub fn new(owner: Address, signer: Address, channel: impl Into<String>) -> Self {
        Self {
            owner,
            signer,
            channel: channel.into(),
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.owner != self.signer
    }
}

/// The kinds of write a ledger accepts, used in authorizations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    Aggregate,
    Post,
    Store,
}

impl MessageKind {
    /// Wire name, as it appears in authorization `types`
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Aggregate => "AGGREGATE",
            MessageKind::Post => "POST",
            MessageKind::Store => "STORE",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document together with the version it was read at
///
/// Versions start at 1. A document that was never written is reported
/// as absent rather than as version 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub version: u64,
    pub content: T,
}

impl<T> Versioned<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Versioned<U> {
        Versioned {
            version: self.version,
            content: f(self.content),
        }
    }
}

/// An immutable, content-addressed record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub owner: Address,
    #[serde(rename = "type")]
    pub post_type: String,
    pub content: Value,
}

impl Post {
    /// Content address of this post
    ///
    /// Computed over the serialized owner, type and content. JSON objects
    /// serialize with sorted keys, so submitting identical content twice
    /// yields the same hash.
    pub fn item_hash(&self) -> Result<ItemHash, LedgerError> {
        Ok(ItemHash::digest(&serde_json::to_vec(self)?))
    }
}
