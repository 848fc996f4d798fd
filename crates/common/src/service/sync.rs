use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

use super::{BedrockService, FileError};
use crate::drive::{DriveState, Generation};
use crate::ledger::LedgerProvider;

/// A [`DriveState`] kept in sync with the ledger
///
/// Loads are tied to the lifetime of whatever displays the drive. Each
/// one takes a ticket before it starts and drops its result if a newer
/// load began, or [`DriveSync::invalidate`] was called, in the meantime.
#[derive(Debug)]
pub struct DriveSync<P> {
    service: Arc<BedrockService<P>>,
    state: Arc<RwLock<DriveState>>,
    listing: Generation,
    content: Generation,
}

impl<P: LedgerProvider> DriveSync<P> {
    pub fn new(service: Arc<BedrockService<P>>) -> Self {
        Self {
            service,
            state: Arc::new(RwLock::new(DriveState::new())),
            listing: Generation::new(),
            content: Generation::new(),
        }
    }

    pub fn service(&self) -> &Arc<BedrockService<P>> {
        &self.service
    }

    pub fn state(&self) -> &Arc<RwLock<DriveState>> {
        &self.state
    }

    pub fn snapshot(&self) -> DriveState {
        self.state.read().clone()
    }

    /// Rebuild the file listing from the ledger
    ///
    /// Includes trashed files and files shared by every contact. Content
    /// already loaded is kept for files whose post did not change.
    ///
    /// # Returns
    /// Whether the result was applied
    pub async fn reload(&self) -> Result<bool, FileError> {
        let ticket = self.listing.begin();

        let entries = self.service.fetch_all_entries().await?;
        let mut files = self.service.fetch_files_meta(&entries).await;

        let contacts = match self.service.fetch_contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                tracing::warn!(error = %e, "could not load contacts, skipping shared files");
                Vec::new()
            }
        };
        let mut shared = Vec::new();
        for contact in &contacts {
            match self.service.fetch_files_shared_by(contact).await {
                Ok(files) => shared.extend(files),
                Err(e) => {
                    tracing::warn!(contact = %contact.address, error = %e, "could not load shared files")
                }
            }
        }

        let mut state = self.state.write();
        if !self.listing.is_current(ticket) {
            tracing::debug!("drive reload superseded, discarding result");
            return Ok(false);
        }

        let mut cached: HashMap<_, _> = state
            .files()
            .iter()
            .filter_map(|f| f.content.clone().map(|c| (f.post_hash.clone(), c)))
            .collect();
        for file in files.iter_mut().filter(|f| !f.is_deleted()) {
            file.content = cached.remove(&file.post_hash);
        }
        state.set_files(files);
        state.set_shared_files(shared);
        Ok(true)
    }

    /// Decrypted content of the file at `path`, own or shared
    ///
    /// Returns `None` if the load was superseded. Content of own files is
    /// cached in the state.
    pub async fn load_content(&self, path: &str) -> Result<Option<Bytes>, FileError> {
        let ticket = self.content.begin();

        let (file, own) = {
            let state = self.state.read();
            match state.file(path) {
                Some(file) => (file.clone(), true),
                None => state
                    .shared_files()
                    .iter()
                    .find(|f| f.path == path)
                    .map(|f| (f.clone(), false))
                    .ok_or_else(|| FileError::NotFound(path.to_string()))?,
            }
        };
        if let Some(content) = file.content {
            return Ok(Some(content));
        }

        let content = self.service.download_file(&file).await?;
        if !self.content.is_current(ticket) {
            tracing::debug!(path, "content load superseded, discarding result");
            return Ok(None);
        }
        if own {
            self.state.write().update_file_content(path, content.clone());
        }
        Ok(Some(content))
    }

    /// Drop the results of every load still in flight
    pub fn invalidate(&self) {
        self.listing.invalidate();
        self.content.invalidate();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::BedrockConfig;
    use crate::crypto::LocalWallet;
    use crate::ledger::MemoryLedger;
    use crate::service::FileSource;

    async fn setup() -> DriveSync<MemoryLedger> {
        let wallet = LocalWallet::generate().unwrap();
        let service = BedrockService::connect(
            &wallet,
            Arc::new(MemoryLedger::new()),
            &BedrockConfig::default(),
        )
        .await
        .unwrap();
        let report = service
            .upload_files("/docs", vec![FileSource::new("a.txt", "alpha")])
            .await
            .unwrap();
        service.save_files(report.uploaded).await.unwrap();
        DriveSync::new(Arc::new(service))
    }

    #[tokio::test]
    async fn test_reload_and_load_content() {
        let sync = setup().await;
        assert!(sync.reload().await.unwrap());
        assert_eq!(sync.snapshot().files().len(), 1);

        let content = sync.load_content("/docs/a.txt").await.unwrap();
        assert_eq!(content.as_deref(), Some(&b"alpha"[..]));
        assert!(sync.snapshot().file("/docs/a.txt").unwrap().content.is_some());

        // cached content survives a reload
        assert!(sync.reload().await.unwrap());
        assert!(sync.snapshot().file("/docs/a.txt").unwrap().content.is_some());
    }

    #[tokio::test]
    async fn test_invalidated_reload_is_discarded() {
        let sync = setup().await;

        let (applied, _) = tokio::join!(sync.reload(), async {
            tokio::task::yield_now().await;
            sync.invalidate();
        });
        assert!(!applied.unwrap());
        assert!(sync.snapshot().files().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let sync = setup().await;
        let err = sync.load_content("/nope.txt").await.unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
    }
}
