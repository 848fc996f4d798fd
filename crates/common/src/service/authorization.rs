use serde::{Deserialize, Serialize};

use crate::ledger::{
    Address, Authorization, Ledger, LedgerError, LedgerProvider, Parsed, SecurityAggregate,
    SECURITY_KEY,
};

/// What [`ensure_authorization`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationOutcome {
    /// The delegate could already write on the channel
    AlreadyAuthorized,
    /// A grant was added next to the existing ones
    Granted,
    /// The security aggregate was unreadable and has been replaced
    Recreated,
}

/// Make sure `delegate` may write on the owner's behalf
///
/// `owner_ledger` must be signed by the owner itself, since delegates can
/// never write the security aggregate. Other principals' authorizations
/// are preserved. The only exception is an aggregate that fails to parse,
/// which is replaced by one holding just the delegate's grant.
pub async fn ensure_authorization<P: LedgerProvider>(
    owner_ledger: &Ledger<P>,
    delegate: &Address,
) -> Result<AuthorizationOutcome, LedgerError> {
    let channel = owner_ledger.envelope().channel.clone();
    let owner = owner_ledger.owner().clone();
    let grant = Authorization::for_channel(delegate.clone(), channel.clone());

    let current = owner_ledger
        .fetch_aggregate_parsed::<SecurityAggregate>(&owner, SECURITY_KEY)
        .await?;

    match current.content {
        Parsed::Ok(security) if security.grants(delegate, &channel) => {
            tracing::debug!(%owner, %delegate, "delegate already authorized");
            Ok(AuthorizationOutcome::AlreadyAuthorized)
        }
        Parsed::Ok(_) | Parsed::UseDefault => {
            owner_ledger
                .update_aggregate(SECURITY_KEY, |mut security: SecurityAggregate| {
                    if !security.grants(delegate, &channel) {
                        // stale or narrower grants for the same address are replaced
                        security.authorizations.retain(|a| !a.is_for(delegate));
                        security.authorizations.push(grant.clone());
                    }
                    Ok::<_, LedgerError>(security)
                })
                .await?;
            tracing::info!(%owner, %delegate, channel, "delegate authorized");
            Ok(AuthorizationOutcome::Granted)
        }
        Parsed::Invalid(reason) => {
            tracing::warn!(%owner, reason, "security aggregate unreadable, recreating it");
            owner_ledger
                .replace_aggregate(
                    SECURITY_KEY,
                    &SecurityAggregate {
                        authorizations: vec![grant],
                    },
                )
                .await?;
            Ok(AuthorizationOutcome::Recreated)
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::ledger::{Envelope, MemoryLedger};
    use serde_json::json;

    fn addr(b: u8) -> Address {
        Address::from_bytes(&[b; 20])
    }

    fn owner_ledger(provider: Arc<MemoryLedger>) -> Ledger<MemoryLedger> {
        Ledger::new(provider, Envelope::new(addr(1), addr(1), "bedrock"))
    }

    async fn security(ledger: &Ledger<MemoryLedger>) -> SecurityAggregate {
        ledger.fetch_aggregate(SECURITY_KEY).await.unwrap()
    }

    #[tokio::test]
    async fn test_grant_then_already_authorized() {
        let ledger = owner_ledger(Arc::new(MemoryLedger::new()));

        let first = ensure_authorization(&ledger, &addr(2)).await.unwrap();
        assert_eq!(first, AuthorizationOutcome::Granted);
        let second = ensure_authorization(&ledger, &addr(2)).await.unwrap();
        assert_eq!(second, AuthorizationOutcome::AlreadyAuthorized);

        assert_eq!(security(&ledger).await.authorizations.len(), 1);
    }

    #[tokio::test]
    async fn test_existing_grants_preserved() {
        let ledger = owner_ledger(Arc::new(MemoryLedger::new()));
        let other = Authorization {
            types: vec!["POST".into()],
            ..Authorization::for_channel(addr(3), "elsewhere")
        };
        let narrow_self = Authorization {
            types: vec!["STORE".into()],
            ..Authorization::for_channel(addr(2), "bedrock")
        };
        ledger
            .replace_aggregate(
                SECURITY_KEY,
                &SecurityAggregate {
                    authorizations: vec![other.clone(), narrow_self],
                },
            )
            .await
            .unwrap();

        let outcome = ensure_authorization(&ledger, &addr(2)).await.unwrap();
        assert_eq!(outcome, AuthorizationOutcome::Granted);

        let security = security(&ledger).await;
        assert_eq!(security.authorizations.len(), 2);
        assert!(security.authorizations.contains(&other));
        assert!(security.grants(&addr(2), "bedrock"));
    }

    #[tokio::test]
    async fn test_malformed_security_recreated() {
        let provider = Arc::new(MemoryLedger::new());
        let ledger = owner_ledger(provider.clone());
        provider
            .put_aggregate(
                ledger.envelope(),
                SECURITY_KEY,
                None,
                json!({"authorizations": [{"channels": ["bedrock"]}]}),
            )
            .await
            .unwrap();

        let outcome = ensure_authorization(&ledger, &addr(2)).await.unwrap();
        assert_eq!(outcome, AuthorizationOutcome::Recreated);
        let security = security(&ledger).await;
        assert_eq!(
            security.authorizations,
            vec![Authorization::for_channel(addr(2), "bedrock")]
        );
    }

    #[tokio::test]
    async fn test_foreign_grants_preserved() {
        let provider = Arc::new(MemoryLedger::new());
        let ledger = owner_ledger(provider.clone());
        let forget = json!({"address": "0x3333333333333333333333333333333333333333", "types": ["FORGET"]});
        let solana = json!({"address": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin", "channels": ["other"]});
        provider
            .put_aggregate(
                ledger.envelope(),
                SECURITY_KEY,
                None,
                json!({"authorizations": [forget, solana]}),
            )
            .await
            .unwrap();

        let outcome = ensure_authorization(&ledger, &addr(2)).await.unwrap();
        assert_eq!(outcome, AuthorizationOutcome::Granted);

        let security = security(&ledger).await;
        assert_eq!(security.authorizations.len(), 3);
        assert!(security.authorizations.iter().any(|a| a.types == vec!["FORGET".to_string()]));
        assert!(security
            .authorizations
            .iter()
            .any(|a| a.address == "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"));
        assert!(security.grants(&addr(2), "bedrock"));
    }
}
