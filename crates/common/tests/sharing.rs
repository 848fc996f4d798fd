//! Integration tests for contacts and file sharing between wallets

mod common;

use std::sync::Arc;

use ::common::crypto::SecretKey;
use ::common::ledger::{Address, LedgerError, MemoryLedger};
use ::common::service::{
    BedrockService, Contact, ContactError, ContactsAggregate, EncryptedContact, FileError,
    CONTACTS_KEY,
};

fn contact_of(name: &str, service: &BedrockService<MemoryLedger>) -> Contact {
    Contact {
        name: name.to_string(),
        address: service.address().clone(),
        public_key: service.public_key(),
    }
}

#[tokio::test]
async fn test_contacts_lifecycle() {
    let (alice, provider, _) = common::setup_test_env().await;
    let (bob, _) = common::new_user(provider.clone()).await;
    let bob_contact = contact_of("bob", &bob);

    alice
        .create_contact("bob", bob_contact.address.clone(), bob_contact.public_key)
        .await
        .unwrap();
    assert_eq!(alice.fetch_contacts().await.unwrap(), vec![bob_contact.clone()]);

    let err = alice
        .create_contact("bob", Address::from_bytes(&[9; 20]), SecretKey::generate().unwrap().public())
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::DuplicateName(_)));

    let err = alice
        .create_contact("robert", bob_contact.address.clone(), bob_contact.public_key)
        .await
        .unwrap_err();
    assert!(matches!(err, ContactError::DuplicatePublicKey(_)));

    alice.delete_contact(&bob_contact.public_key).await.unwrap();
    assert!(alice.fetch_contacts().await.unwrap().is_empty());

    let err = alice.delete_contact(&bob_contact.public_key).await.unwrap_err();
    assert!(matches!(err, ContactError::NotFound(_)));
}

#[tokio::test]
async fn test_contact_names_are_encrypted() {
    let (alice, provider, _) = common::setup_test_env().await;
    let key = SecretKey::generate().unwrap().public();
    alice
        .create_contact("carol", key.address(), key)
        .await
        .unwrap();

    let raw = ::common::ledger::LedgerProvider::aggregate(
        provider.as_ref(),
        alice.address(),
        ::common::service::CONTACTS_KEY,
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!raw.content.to_string().contains("carol"));

    alice.reset_contacts().await.unwrap();
    assert!(alice.fetch_contacts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_corrupt_contact_isolated() {
    let (alice, _, _) = common::setup_test_env().await;
    let dave = SecretKey::generate().unwrap().public();
    alice.create_contact("dave", dave.address(), dave).await.unwrap();

    let broken = SecretKey::generate().unwrap().public();
    alice
        .ledger()
        .update_aggregate(CONTACTS_KEY, |mut aggregate: ContactsAggregate| {
            aggregate.contacts.push(EncryptedContact {
                name: "plaintext name".to_string(),
                address: broken.address(),
                public_key: broken,
            });
            Ok::<_, LedgerError>(aggregate)
        })
        .await
        .unwrap();

    let names: Vec<_> = alice
        .fetch_contacts()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["dave"]);

    let erin = SecretKey::generate().unwrap().public();
    alice.create_contact("erin", erin.address(), erin).await.unwrap();
    assert_eq!(alice.fetch_contacts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_share_and_unshare() {
    let provider = Arc::new(MemoryLedger::new());
    let (alice, _) = common::new_user(provider.clone()).await;
    let (bob, _) = common::new_user(provider.clone()).await;
    let alice_contact = contact_of("alice", &alice);
    let bob_contact = contact_of("bob", &bob);

    common::add_files(&alice, "/docs", &[("plan.txt", "secret plan"), ("other.txt", "x")]).await;
    alice.share_file("/docs/plan.txt", &bob_contact).await.unwrap();

    let err = alice
        .share_file("/docs/plan.txt", &bob_contact)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::AlreadyShared { .. }));

    let shared = bob.fetch_files_shared_by(&alice_contact).await.unwrap();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].path, "/docs/plan.txt");
    let content = bob.download_file(&shared[0]).await.unwrap();
    assert_eq!(content.as_ref(), b"secret plan");

    let entries = alice.fetch_file_entries().await.unwrap();
    let plan = entries.iter().find(|e| e.path == "/docs/plan.txt").unwrap();
    assert_eq!(plan.shared_with[0].public_key, bob.public_key());

    alice
        .unshare_file("/docs/plan.txt", &bob_contact.public_key)
        .await
        .unwrap();
    assert!(bob.fetch_files_shared_by(&alice_contact).await.unwrap().is_empty());

    let err = alice
        .unshare_file("/docs/plan.txt", &bob_contact.public_key)
        .await
        .unwrap_err();
    assert!(matches!(err, FileError::NotShared { .. }));
}

#[tokio::test]
async fn test_shared_file_survives_owner_move() {
    let provider = Arc::new(MemoryLedger::new());
    let (alice, _) = common::new_user(provider.clone()).await;
    let (bob, _) = common::new_user(provider.clone()).await;

    common::add_files(&alice, "/", &[("a.txt", "a")]).await;
    alice
        .share_file("/a.txt", &contact_of("bob", &bob))
        .await
        .unwrap();
    alice.move_file("/a.txt", "/moved/a.txt").await.unwrap();

    let shared = bob
        .fetch_files_shared_by(&contact_of("alice", &alice))
        .await
        .unwrap();
    assert_eq!(shared.len(), 1);
    // recipients see the path at sharing time
    assert_eq!(shared[0].path, "/a.txt");
}

#[tokio::test]
async fn test_trashed_files_not_shared() {
    let provider = Arc::new(MemoryLedger::new());
    let (alice, _) = common::new_user(provider.clone()).await;
    let (bob, _) = common::new_user(provider.clone()).await;

    common::add_files(&alice, "/", &[("a.txt", "a")]).await;
    alice
        .share_file("/a.txt", &contact_of("bob", &bob))
        .await
        .unwrap();
    alice
        .soft_delete_files(&["/a.txt".to_string()], chrono::Utc::now())
        .await
        .unwrap();

    let shared = bob
        .fetch_files_shared_by(&contact_of("alice", &alice))
        .await
        .unwrap();
    assert!(shared.is_empty());
}

#[tokio::test]
async fn test_third_party_cannot_read_share() {
    let provider = Arc::new(MemoryLedger::new());
    let (alice, _) = common::new_user(provider.clone()).await;
    let (bob, _) = common::new_user(provider.clone()).await;
    let (eve, _) = common::new_user(provider.clone()).await;

    common::add_files(&alice, "/", &[("a.txt", "a")]).await;
    alice
        .share_file("/a.txt", &contact_of("bob", &bob))
        .await
        .unwrap();

    let seen = eve
        .fetch_files_shared_by(&contact_of("alice", &alice))
        .await
        .unwrap();
    assert!(seen.is_empty());
}
