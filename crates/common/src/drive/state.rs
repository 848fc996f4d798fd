use std::collections::BTreeSet;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::path;
use crate::crypto::{Iv, PublicKey, Secret};
use crate::ledger::ItemHash;

/// A file as presented to the user
///
/// Built from an aggregate entry joined with its decrypted metadata post.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveFile {
    pub path: String,
    pub name: String,
    pub post_hash: ItemHash,
    pub store_hash: ItemHash,
    pub key: Secret,
    pub iv: Iv,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub shared_with: Vec<PublicKey>,
    /// Decrypted content, once loaded
    pub content: Option<Bytes>,
}

impl DriveFile {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A folder, derived from file paths or created explicitly
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DriveFolder {
    /// Always ends with `/`
    pub path: String,
}

/// In-memory view of a drive
///
/// Purely synchronous. Every method only touches local state; persisting
/// a change is the caller's job. Folders are not stored: they are derived
/// from the paths of live files, plus folders created explicitly in this
/// session. Explicit folders are never persisted and are gone on the next
/// reload unless a file was placed in them.
#[derive(Debug, Clone)]
pub struct DriveState {
    files: Vec<DriveFile>,
    shared_files: Vec<DriveFile>,
    explicit_folders: BTreeSet<String>,
    cwd: String,
}

impl Default for DriveState {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveState {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            shared_files: Vec::new(),
            explicit_folders: BTreeSet::new(),
            cwd: "/".to_string(),
        }
    }

    pub fn files(&self) -> &[DriveFile] {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&DriveFile> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn live_files(&self) -> impl Iterator<Item = &DriveFile> {
        self.files.iter().filter(|f| !f.is_deleted())
    }

    pub fn trashed_files(&self) -> impl Iterator<Item = &DriveFile> {
        self.files.iter().filter(|f| f.is_deleted())
    }

    pub fn set_files(&mut self, files: Vec<DriveFile>) {
        self.files = files;
    }

    pub fn shared_files(&self) -> &[DriveFile] {
        &self.shared_files
    }

    pub fn set_shared_files(&mut self, files: Vec<DriveFile>) {
        self.shared_files = files;
    }

    pub fn add_file(&mut self, file: DriveFile) {
        self.files.push(file);
    }

    pub fn add_files(&mut self, files: impl IntoIterator<Item = DriveFile>) {
        self.files.extend(files);
    }

    /// Create an empty folder that lives only in this view
    pub fn add_folder(&mut self, folder: &str) -> DriveFolder {
        let path = path::normalize_dir(folder);
        if path != "/" {
            self.explicit_folders.insert(path.clone());
        }
        DriveFolder { path }
    }

    /// Every folder: ancestors of live files plus explicit folders
    pub fn folders(&self) -> Vec<DriveFolder> {
        let mut paths: BTreeSet<String> = self.explicit_folders.clone();
        for file in self.live_files() {
            paths.extend(path::ancestors(&file.path));
        }
        paths.into_iter().map(|path| DriveFolder { path }).collect()
    }

    /// Direct children of `dir`
    pub fn list(&self, dir: &str, trash: bool) -> (Vec<DriveFolder>, Vec<&DriveFile>) {
        let dir = path::normalize_dir(dir);
        let is_child = |p: &str| p != dir && path::parent(p) == dir;

        let folders = if trash {
            Vec::new()
        } else {
            self.folders()
                .into_iter()
                .filter(|f| is_child(&f.path))
                .collect()
        };
        let files = self
            .files
            .iter()
            .filter(|f| f.is_deleted() == trash && is_child(&f.path))
            .collect();
        (folders, files)
    }

    /// Drop a file entirely, returning its storage hash
    pub fn hard_delete_file(&mut self, path: &str) -> Option<ItemHash> {
        let index = self.files.iter().position(|f| f.path == path)?;
        Some(self.files.remove(index).store_hash)
    }

    /// Move a file to the trash, returning its post hash
    pub fn soft_delete_file(&mut self, path: &str, at: DateTime<Utc>) -> Option<ItemHash> {
        let file = self.files.iter_mut().find(|f| f.path == path)?;
        file.deleted_at = Some(at);
        file.content = None;
        Some(file.post_hash.clone())
    }

    pub fn restore_file(&mut self, path: &str) -> Option<ItemHash> {
        let file = self.files.iter_mut().find(|f| f.path == path)?;
        file.deleted_at = None;
        Some(file.post_hash.clone())
    }

    /// Remove a folder and everything under it
    ///
    /// Returns the removed files so the caller can drop their entries.
    pub fn delete_folder(&mut self, folder: &str) -> Vec<DriveFile> {
        let dir = path::normalize_dir(folder);
        self.explicit_folders.retain(|f| !f.starts_with(&dir));
        let (removed, kept) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|f| path::is_within(&f.path, &dir));
        self.files = kept;
        removed
    }

    pub fn move_file(&mut self, old_path: &str, new_path: &str) -> bool {
        match self.files.iter_mut().find(|f| f.path == old_path) {
            Some(file) => {
                file.path = new_path.to_string();
                file.name = path::file_name(new_path).to_string();
                true
            }
            None => false,
        }
    }

    /// Move every file and folder under `old` to `new`
    ///
    /// Returns `(before, after)` for each moved file.
    pub fn move_folder(&mut self, old: &str, new: &str) -> Vec<(DriveFile, DriveFile)> {
        let old_dir = path::normalize_dir(old);
        let new_dir = path::normalize_dir(new);

        self.explicit_folders = std::mem::take(&mut self.explicit_folders)
            .into_iter()
            .map(|f| path::rebase(&f, &old_dir, &new_dir).unwrap_or(f))
            .collect();

        let mut pairs = Vec::new();
        for file in self.files.iter_mut() {
            if let Some(moved) = path::rebase(&file.path, &old_dir, &new_dir) {
                let before = file.clone();
                file.path = moved;
                pairs.push((before, file.clone()));
            }
        }
        pairs
    }

    pub fn update_file_content(&mut self, path: &str, content: Bytes) -> Option<Bytes> {
        let file = self.files.iter_mut().find(|f| f.path == path)?;
        file.content = Some(content.clone());
        Some(content)
    }

    pub fn update_files_content(
        &mut self,
        updates: impl IntoIterator<Item = (String, Bytes)>,
    ) -> Vec<Option<Bytes>> {
        updates
            .into_iter()
            .map(|(path, content)| self.update_file_content(&path, content))
            .collect()
    }

    pub fn current_working_directory(&self) -> &str {
        &self.cwd
    }

    pub fn change_current_working_directory(&mut self, dir: &str) {
        self.cwd = path::normalize_dir(dir);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn file(path: &str) -> DriveFile {
        DriveFile {
            path: path.to_string(),
            name: path::file_name(path).to_string(),
            post_hash: ItemHash::digest(format!("post:{path}").as_bytes()),
            store_hash: ItemHash::digest(format!("store:{path}").as_bytes()),
            key: Secret::from([1u8; 32]),
            iv: Iv::from([2u8; 12]),
            size: 4,
            created_at: Utc::now(),
            deleted_at: None,
            shared_with: Vec::new(),
            content: None,
        }
    }

    fn drive(paths: &[&str]) -> DriveState {
        let mut state = DriveState::new();
        state.add_files(paths.iter().map(|p| file(p)));
        state
    }

    #[test]
    fn test_folders_are_derived_from_files() {
        let state = drive(&["/a/b/x", "/a/c/z", "/top.txt"]);
        let folders: Vec<String> = state.folders().into_iter().map(|f| f.path).collect();
        assert_eq!(folders, vec!["/a/", "/a/b/", "/a/c/"]);
    }

    #[test]
    fn test_explicit_folder_is_transient_view_state() {
        let mut state = drive(&["/a/x"]);
        let folder = state.add_folder("empty");
        assert_eq!(folder.path, "/empty/");
        assert!(state.folders().contains(&folder));

        state.set_files(Vec::new());
        // explicit folders survive a file reset, but not a new view
        assert!(state.folders().contains(&folder));
        assert!(DriveState::new().folders().is_empty());
    }

    #[test]
    fn test_move_folder_cascade() {
        let mut state = drive(&["/a/b/x", "/a/b/y", "/a/c/z"]);
        let pairs = state.move_folder("/a/b/", "/a/d/");

        assert_eq!(pairs.len(), 2);
        let mut moved: Vec<(String, String)> = pairs
            .iter()
            .map(|(old, new)| (old.path.clone(), new.path.clone()))
            .collect();
        moved.sort();
        assert_eq!(
            moved,
            vec![
                ("/a/b/x".to_string(), "/a/d/x".to_string()),
                ("/a/b/y".to_string(), "/a/d/y".to_string()),
            ]
        );
        assert!(state.file("/a/c/z").is_some());
        assert!(state.file("/a/b/x").is_none());

        let folders: Vec<String> = state.folders().into_iter().map(|f| f.path).collect();
        assert_eq!(folders, vec!["/a/", "/a/c/", "/a/d/"]);
    }

    #[test]
    fn test_move_folder_moves_explicit_folders() {
        let mut state = drive(&[]);
        state.add_folder("/a/b/empty");
        state.move_folder("/a", "/z");
        let folders: Vec<String> = state.folders().into_iter().map(|f| f.path).collect();
        assert_eq!(folders, vec!["/z/b/empty/"]);
    }

    #[test]
    fn test_delete_folder_returns_removed_files() {
        let mut state = drive(&["/a/b/x", "/a/bc/y", "/a/c/z"]);
        state.add_folder("/a/b/empty");
        let removed = state.delete_folder("/a/b");

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].path, "/a/b/x");
        assert!(state.file("/a/bc/y").is_some());
        assert!(!state.folders().iter().any(|f| f.path.starts_with("/a/b/")));
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let mut state = drive(&["/docs/report.pdf"]);
        state.update_file_content("/docs/report.pdf", Bytes::from_static(b"data"));

        let post_hash = state
            .soft_delete_file("/docs/report.pdf", Utc::now())
            .unwrap();
        assert_eq!(post_hash, state.files()[0].post_hash);
        assert_eq!(state.live_files().count(), 0);
        assert_eq!(state.trashed_files().count(), 1);
        assert!(state.files()[0].content.is_none());

        state.restore_file("/docs/report.pdf").unwrap();
        assert_eq!(state.live_files().count(), 1);
        assert!(state.soft_delete_file("/missing", Utc::now()).is_none());
    }

    #[test]
    fn test_hard_delete_returns_store_hash() {
        let mut state = drive(&["/a.txt", "/b.txt"]);
        let expected = state.file("/a.txt").unwrap().store_hash.clone();
        assert_eq!(state.hard_delete_file("/a.txt"), Some(expected));
        assert_eq!(state.files().len(), 1);
        assert_eq!(state.hard_delete_file("/a.txt"), None);
    }

    #[test]
    fn test_move_file_renames() {
        let mut state = drive(&["/old.txt"]);
        assert!(state.move_file("/old.txt", "/dir/new.txt"));
        let file = state.file("/dir/new.txt").unwrap();
        assert_eq!(file.name, "new.txt");
        assert!(!state.move_file("/old.txt", "/again.txt"));
    }

    #[test]
    fn test_cwd_is_normalized() {
        let mut state = DriveState::new();
        assert_eq!(state.current_working_directory(), "/");
        state.change_current_working_directory("docs/reports");
        assert_eq!(state.current_working_directory(), "/docs/reports/");
    }

    #[test]
    fn test_list_direct_children() {
        let mut state = drive(&["/docs/a.txt", "/docs/sub/b.txt", "/c.txt"]);
        state.soft_delete_file("/c.txt", Utc::now());

        let (folders, files) = state.list("/", false);
        assert_eq!(
            folders,
            vec![DriveFolder {
                path: "/docs/".into()
            }]
        );
        assert!(files.is_empty());

        let (folders, files) = state.list("/docs", false);
        assert_eq!(folders.len(), 1);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "/docs/a.txt");

        let (_, trashed) = state.list("/", true);
        assert_eq!(trashed.len(), 1);
    }

    #[test]
    fn test_update_files_content() {
        let mut state = drive(&["/a", "/b"]);
        let results = state.update_files_content(vec![
            ("/a".to_string(), Bytes::from_static(b"1")),
            ("/missing".to_string(), Bytes::from_static(b"2")),
        ]);
        assert_eq!(results, vec![Some(Bytes::from_static(b"1")), None]);
        assert_eq!(state.file("/a").unwrap().content, Some(Bytes::from_static(b"1")));
    }
}
