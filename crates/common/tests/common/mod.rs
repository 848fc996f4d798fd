//! Shared setup for service integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::config::BedrockConfig;
use common::crypto::LocalWallet;
use common::ledger::{LedgerProvider, MemoryLedger};
use common::service::{BedrockService, FileEntry, FileSource};
use tracing_subscriber::EnvFilter;

/// Route library logs to the test output, controlled by `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh wallet with a session on a new in-memory ledger
pub async fn setup_test_env() -> (BedrockService<MemoryLedger>, Arc<MemoryLedger>, LocalWallet) {
    init_tracing();
    let provider = Arc::new(MemoryLedger::new());
    let (service, wallet) = new_user(provider.clone()).await;
    (service, provider, wallet)
}

/// A fresh wallet with a session on an existing ledger
pub async fn new_user<P: LedgerProvider>(provider: Arc<P>) -> (BedrockService<P>, LocalWallet) {
    let wallet = LocalWallet::generate().unwrap();
    let service = connect(&wallet, provider).await;
    (service, wallet)
}

pub async fn connect<P: LedgerProvider>(wallet: &LocalWallet, provider: Arc<P>) -> BedrockService<P> {
    BedrockService::connect(wallet, provider, &BedrockConfig::default())
        .await
        .unwrap()
}

/// Upload and save files under `dir`, asserting that every one succeeded
pub async fn add_files<P: LedgerProvider>(
    service: &BedrockService<P>,
    dir: &str,
    files: &[(&str, &str)],
) -> Vec<FileEntry> {
    let sources = files
        .iter()
        .map(|(name, content)| FileSource::new(*name, content.as_bytes().to_vec()))
        .collect();
    let report = service.upload_files(dir, sources).await.unwrap();
    assert!(report.failed.is_empty(), "upload failed: {:?}", report.failed);
    let saved = service.save_files(report.uploaded).await.unwrap();
    assert!(saved.failed.is_empty(), "save failed: {:?}", saved.failed);
    saved.saved
}

/// Sorted paths of the live entries
pub async fn live_paths<P: LedgerProvider>(service: &BedrockService<P>) -> Vec<String> {
    let mut paths: Vec<String> = service
        .fetch_file_entries()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.path)
        .collect();
    paths.sort();
    paths
}
