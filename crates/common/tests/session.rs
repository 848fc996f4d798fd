//! Integration tests for sessions, delegate authorization and persistence

mod common;

use std::sync::Arc;

use ::common::config::BedrockConfig;
use ::common::crypto::{LocalWallet, Wallet};
use ::common::ledger::{
    Address, Envelope, FsLedger, Ledger, LedgerError, MemoryLedger, SecurityAggregate,
    SECURITY_KEY,
};
use ::common::service::{AuthorizationOutcome, BedrockService, FileEntriesAggregate, FILE_ENTRIES_KEY};
use tempfile::TempDir;

#[tokio::test]
async fn test_reconnect_reuses_identity() {
    let (first, provider, wallet) = common::setup_test_env().await;
    assert_eq!(first.authorization(), AuthorizationOutcome::Granted);

    let second = common::connect(&wallet, provider).await;
    assert_eq!(second.authorization(), AuthorizationOutcome::AlreadyAuthorized);
    assert_eq!(first.public_key(), second.public_key());
    assert_eq!(first.delegate_address(), second.delegate_address());
    assert_ne!(first.address(), &first.delegate_address());
}

#[tokio::test]
async fn test_writes_land_under_wallet_address() {
    let (service, provider, wallet) = common::setup_test_env().await;
    common::add_files(&service, "/", &[("a.txt", "a")]).await;

    let owner = Ledger::new(
        provider,
        Envelope::new(wallet.address(), wallet.address(), "bedrock"),
    );
    let aggregate: FileEntriesAggregate = owner.fetch_aggregate(FILE_ENTRIES_KEY).await.unwrap();
    assert_eq!(aggregate.files.len(), 1);
    // paths are never stored in the clear
    assert!(!aggregate.files[0].path.contains("a.txt"));
}

#[tokio::test]
async fn test_unauthorized_signer_rejected() {
    let (service, provider, _) = common::setup_test_env().await;

    let intruder = Ledger::new(
        provider,
        Envelope::new(
            service.address().clone(),
            Address::from_bytes(&[0xee; 20]),
            "bedrock",
        ),
    );
    let err = intruder
        .replace_aggregate(FILE_ENTRIES_KEY, &FileEntriesAggregate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_delegate_cannot_rewrite_security() {
    let (service, _, _) = common::setup_test_env().await;

    let err = service
        .ledger()
        .replace_aggregate(SECURITY_KEY, &SecurityAggregate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_other_channel_not_authorized() {
    let provider = Arc::new(MemoryLedger::new());
    let wallet = LocalWallet::generate().unwrap();
    let service = common::connect(&wallet, provider.clone()).await;

    let elsewhere = Ledger::new(
        provider,
        Envelope::new(
            service.address().clone(),
            service.delegate_address(),
            "elsewhere",
        ),
    );
    let err = elsewhere
        .replace_aggregate(FILE_ENTRIES_KEY, &FileEntriesAggregate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_custom_channel() {
    let provider = Arc::new(MemoryLedger::new());
    let wallet = LocalWallet::generate().unwrap();
    let config = BedrockConfig {
        channel: "testnet".to_string(),
        ..BedrockConfig::default()
    };
    let service = BedrockService::connect(&wallet, provider, &config)
        .await
        .unwrap();
    assert_eq!(service.ledger().envelope().channel, "testnet");
    common::add_files(&service, "/", &[("a.txt", "a")]).await;
}

#[tokio::test]
async fn test_fs_ledger_persists_across_sessions() {
    let temp = TempDir::new().unwrap();
    let wallet = LocalWallet::generate().unwrap();

    {
        let provider = Arc::new(FsLedger::open(temp.path()).await.unwrap());
        let service = common::connect(&wallet, provider).await;
        common::add_files(&service, "/docs", &[("a.txt", "persisted")]).await;
    }

    let provider = Arc::new(FsLedger::open(temp.path()).await.unwrap());
    let service = common::connect(&wallet, provider).await;
    assert_eq!(service.authorization(), AuthorizationOutcome::AlreadyAuthorized);

    let entries = service.fetch_file_entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    let files = service.fetch_files_meta(&entries).await;
    let content = service.download_file(&files[0]).await.unwrap();
    assert_eq!(content.as_ref(), b"persisted");
}
