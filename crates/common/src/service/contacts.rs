use super::types::{Contact, ContactsAggregate, EncryptedContact, CONTACTS_KEY};
use super::{BedrockService, ContactError};
use crate::crypto::PublicKey;
use crate::ledger::{Address, LedgerProvider, Parsed};

impl<P: LedgerProvider> BedrockService<P> {
    /// Add a contact
    ///
    /// Names and public keys are unique across the contact list. Both are
    /// checked against the latest aggregate, so two sessions adding the
    /// same contact concurrently cannot both succeed.
    pub async fn create_contact(
        &self,
        name: &str,
        address: Address,
        public_key: PublicKey,
    ) -> Result<(), ContactError> {
        let sealed_name = self.wrap_for_self(name)?;

        self.ledger
            .update_aggregate(CONTACTS_KEY, |mut aggregate: ContactsAggregate| -> Result<_, ContactError> {
                if aggregate.contacts.iter().any(|c| c.public_key == public_key) {
                    return Err(ContactError::DuplicatePublicKey(public_key));
                }
                let name_taken = aggregate
                    .contacts
                    .iter()
                    .filter_map(|c| self.unwrap_own(&c.name).ok())
                    .any(|existing| existing == name);
                if name_taken {
                    return Err(ContactError::DuplicateName(name.to_string()));
                }
                aggregate.contacts.push(EncryptedContact {
                    name: sealed_name.clone(),
                    address: address.clone(),
                    public_key,
                });
                Ok(aggregate)
            })
            .await?;

        tracing::info!(%address, %public_key, "contact added");
        Ok(())
    }

    /// Decrypted contact list
    ///
    /// Contacts whose name cannot be decrypted are left out.
    pub async fn fetch_contacts(&self) -> Result<Vec<Contact>, ContactError> {
        let owner = self.address().clone();
        let doc = self
            .ledger
            .fetch_aggregate_parsed::<ContactsAggregate>(&owner, CONTACTS_KEY)
            .await?;
        let aggregate = match doc.content {
            Parsed::Ok(aggregate) => aggregate,
            Parsed::UseDefault => return Ok(Vec::new()),
            Parsed::Invalid(reason) => {
                tracing::warn!(%owner, reason, "contacts aggregate is malformed, treating it as empty");
                return Ok(Vec::new());
            }
        };

        Ok(aggregate
            .contacts
            .into_iter()
            .filter_map(|c| match self.unwrap_own(&c.name) {
                Ok(name) => Some(Contact {
                    name,
                    address: c.address,
                    public_key: c.public_key,
                }),
                Err(e) => {
                    tracing::warn!(public_key = %c.public_key, error = %e, "dropping contact that failed to decrypt");
                    None
                }
            })
            .collect())
    }

    pub async fn delete_contact(&self, public_key: &PublicKey) -> Result<(), ContactError> {
        self.ledger
            .update_aggregate(CONTACTS_KEY, |mut aggregate: ContactsAggregate| -> Result<_, ContactError> {
                let before = aggregate.contacts.len();
                aggregate.contacts.retain(|c| &c.public_key != public_key);
                if aggregate.contacts.len() == before {
                    return Err(ContactError::NotFound(*public_key));
                }
                Ok(aggregate)
            })
            .await?;
        Ok(())
    }

    /// Forget every contact
    pub async fn reset_contacts(&self) -> Result<(), ContactError> {
        self.ledger
            .replace_aggregate(CONTACTS_KEY, &ContactsAggregate::default())
            .await?;
        Ok(())
    }
}
