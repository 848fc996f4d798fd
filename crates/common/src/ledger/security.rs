//! The `security` aggregate
//!
//! Every owner may publish a list of authorizations naming other
//! addresses that are allowed to write on its behalf. Backends consult it
//! before accepting any write whose signer is not the owner.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema::{parse_or_default, Parsed, Schema};
use super::types::{Address, Envelope, MessageKind};
use super::LedgerError;

/// Aggregate key holding an owner's authorizations
pub const SECURITY_KEY: &str = "security";

/// Permission for `address` to write on behalf of the owner
///
/// Every empty list means "no restriction" for that dimension. Grants
/// written by other clients may name chains, addresses and message types
/// this crate knows nothing about, so those fields stay plain strings and
/// are only matched when a write is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aggregate_keys: Vec<String>,
}

impl Authorization {
    /// Authorization for a single channel, any message kind
    pub fn for_channel(address: Address, channel: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            chain: None,
            channels: vec![channel.into()],
            types: Vec::new(),
            post_types: Vec::new(),
            aggregate_keys: Vec::new(),
        }
    }

    /// Whether the grant names `address`; hex addresses compare
    /// case-insensitively
    pub fn is_for(&self, address: &Address) -> bool {
        self.address.eq_ignore_ascii_case(address.as_str())
    }

    fn allows(list: &[String], value: &str) -> bool {
        list.is_empty() || list.iter().any(|v| v == value)
    }

    /// Whether this grant covers a write of `kind` with the given
    /// post type or aggregate key
    pub fn permits(&self, envelope: &Envelope, kind: MessageKind, detail: &str) -> bool {
        if !self.is_for(&envelope.signer) {
            return false;
        }
        if !Self::allows(&self.channels, &envelope.channel) {
            return false;
        }
        if !Self::allows(&self.types, kind.as_str()) {
            return false;
        }
        match kind {
            MessageKind::Post => Self::allows(&self.post_types, detail),
            MessageKind::Aggregate => Self::allows(&self.aggregate_keys, detail),
            MessageKind::Store => true,
        }
    }

    /// Whether this grant lets `address` do everything a session needs
    /// on `channel`
    pub fn covers(&self, address: &Address, channel: &str) -> bool {
        self.is_for(address)
            && Self::allows(&self.channels, channel)
            && self.types.is_empty()
            && self.post_types.is_empty()
            && self.aggregate_keys.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAggregate {
    #[serde(default)]
    pub authorizations: Vec<Authorization>,
}

impl Schema for SecurityAggregate {}

impl SecurityAggregate {
    pub fn grants(&self, address: &Address, channel: &str) -> bool {
        self.authorizations.iter().any(|a| a.covers(address, channel))
    }
}

/// Check a write against the owner's current security aggregate
///
/// Owners may always write. Delegates need a matching authorization and
/// may never touch the security aggregate itself. An unreadable security
/// aggregate grants nothing.
pub(crate) fn check_write(
    security: Option<Value>,
    envelope: &Envelope,
    kind: MessageKind,
    detail: &str,
) -> Result<(), LedgerError> {
    if !envelope.is_delegated() {
        return Ok(());
    }

    let unauthorized = || LedgerError::Unauthorized {
        signer: envelope.signer.clone(),
        owner: envelope.owner.clone(),
        kind,
    };

    if kind == MessageKind::Aggregate && detail == SECURITY_KEY {
        return Err(unauthorized());
    }

    match parse_or_default::<SecurityAggregate>(security) {
        Parsed::Ok(security)
            if security
                .authorizations
                .iter()
                .any(|a| a.permits(envelope, kind, detail)) =>
        {
            Ok(())
        }
        _ => Err(unauthorized()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn addr(b: u8) -> Address {
        Address::from_bytes(&[b; 20])
    }

    fn security_with(auth: Authorization) -> Option<Value> {
        Some(
            serde_json::to_value(SecurityAggregate {
                authorizations: vec![auth],
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_owner_always_allowed() {
        let envelope = Envelope::new(addr(1), addr(1), "bedrock");
        assert!(check_write(None, &envelope, MessageKind::Aggregate, SECURITY_KEY).is_ok());
        assert!(check_write(None, &envelope, MessageKind::Post, "bedrock_file").is_ok());
    }

    #[test]
    fn test_delegate_needs_authorization() {
        let envelope = Envelope::new(addr(1), addr(2), "bedrock");
        assert!(matches!(
            check_write(None, &envelope, MessageKind::Post, "bedrock_file"),
            Err(LedgerError::Unauthorized { .. })
        ));

        let security = security_with(Authorization::for_channel(addr(2), "bedrock"));
        assert!(check_write(security.clone(), &envelope, MessageKind::Post, "bedrock_file").is_ok());
        assert!(check_write(security, &envelope, MessageKind::Store, "").is_ok());
    }

    #[test]
    fn test_channel_restriction() {
        let envelope = Envelope::new(addr(1), addr(2), "other");
        let security = security_with(Authorization::for_channel(addr(2), "bedrock"));
        assert!(check_write(security, &envelope, MessageKind::Post, "bedrock_file").is_err());
    }

    #[test]
    fn test_delegate_cannot_write_security() {
        let envelope = Envelope::new(addr(1), addr(2), "bedrock");
        let security = security_with(Authorization::for_channel(addr(2), "bedrock"));
        assert!(check_write(security, &envelope, MessageKind::Aggregate, SECURITY_KEY).is_err());
    }

    #[test]
    fn test_type_and_key_restrictions() {
        let envelope = Envelope::new(addr(1), addr(2), "bedrock");
        let auth = Authorization {
            types: vec!["AGGREGATE".into()],
            aggregate_keys: vec!["bedrock_contacts".into()],
            ..Authorization::for_channel(addr(2), "bedrock")
        };
        let security = security_with(auth.clone());
        assert!(check_write(
            security.clone(),
            &envelope,
            MessageKind::Aggregate,
            "bedrock_contacts"
        )
        .is_ok());
        assert!(check_write(
            security.clone(),
            &envelope,
            MessageKind::Aggregate,
            "bedrock_file_entries"
        )
        .is_err());
        assert!(check_write(security, &envelope, MessageKind::Post, "bedrock_file").is_err());
        assert!(!auth.covers(&addr(2), "bedrock"));
    }

    #[test]
    fn test_foreign_grants_parse() {
        let raw = json!({"authorizations": [
            {"address": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin", "chain": "SOL", "channels": ["other"]},
            {"address": "0x0202020202020202020202020202020202020202", "types": ["FORGET", "POST"]},
        ]});
        let Parsed::Ok(security) = parse_or_default::<SecurityAggregate>(Some(raw.clone())) else {
            panic!("foreign grants should parse");
        };
        assert_eq!(security.authorizations.len(), 2);

        let envelope = Envelope::new(addr(1), addr(2), "bedrock");
        assert!(check_write(Some(raw.clone()), &envelope, MessageKind::Post, "bedrock_file").is_ok());
        assert!(check_write(Some(raw), &envelope, MessageKind::Aggregate, "bedrock_contacts").is_err());
    }

    #[test]
    fn test_address_case_insensitive() {
        let auth = Authorization {
            address: "0xABABABABABABABABABABABABABABABABABABABAB".into(),
            ..Authorization::for_channel(addr(0xab), "bedrock")
        };
        assert!(auth.covers(&addr(0xab), "bedrock"));
    }

    #[test]
    fn test_malformed_security_grants_nothing() {
        let envelope = Envelope::new(addr(1), addr(2), "bedrock");
        let security = Some(json!({"authorizations": "garbage"}));
        assert!(check_write(security, &envelope, MessageKind::Post, "bedrock_file").is_err());
    }

    #[test]
    fn test_grants() {
        let security = SecurityAggregate {
            authorizations: vec![
                Authorization::for_channel(addr(3), "bedrock"),
                Authorization {
                    channels: Vec::new(),
                    ..Authorization::for_channel(addr(4), "x")
                },
            ],
        };
        assert!(security.grants(&addr(3), "bedrock"));
        assert!(!security.grants(&addr(3), "elsewhere"));
        assert!(security.grants(&addr(4), "anything"));
        assert!(!security.grants(&addr(5), "bedrock"));
    }
}
