use clap::{Args, Subcommand};

pub mod cat;
pub mod cp;
pub mod ls;
pub mod mv;
pub mod rm;
pub mod share;
pub mod upload;

use common::drive::DriveState;
use common::service::{Contact, ContactError, FailedFile, FileError};

use crate::cli::op::{Op, Session, SessionError};

crate::command_enum! {
    (Upload, upload::Upload),
    (Ls, ls::Ls),
    (Cat, cat::Cat),
    (Mv, mv::Mv),
    (MvDir, mv::MvDir),
    (Rm, rm::Rm),
    (Restore, rm::Restore),
    (Cp, cp::Cp),
    (Share, share::Share),
    (Unshare, share::Unshare),
    (Shared, share::Shared),
}

pub type FilesCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Files {
    #[command(subcommand)]
    pub command: FilesCommand,
}

#[async_trait::async_trait]
impl Op for Files {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no contact named {0}")]
    UnknownContact(String),
    /// Some items of a batch failed; the message lists every outcome
    #[error("{0}")]
    Partial(String),
}

/// Rebuild the drive view from the ledger, trash included
pub async fn load_drive(session: &Session) -> Result<DriveState, FilesError> {
    let entries = session.fetch_all_entries().await?;
    let mut state = DriveState::new();
    state.set_files(session.fetch_files_meta(&entries).await);
    Ok(state)
}

pub async fn find_contact(session: &Session, name: &str) -> Result<Contact, FilesError> {
    session
        .fetch_contacts()
        .await?
        .into_iter()
        .find(|c| c.name == name)
        .ok_or_else(|| FilesError::UnknownContact(name.to_string()))
}

pub fn format_failures(failed: &[FailedFile]) -> Vec<String> {
    failed
        .iter()
        .map(|f| format!("failed {}: {}", f.path, f.error))
        .collect()
}

pub fn format_size(size: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = size as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
