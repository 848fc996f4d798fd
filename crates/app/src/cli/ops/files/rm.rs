use chrono::Utc;
use clap::Args;
use common::service::FileError;

use super::FilesError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Remove the entries for good instead of moving them to the trash.
    /// Encrypted content stays on the ledger, unreadable but not erased.
    #[arg(long)]
    pub hard: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;

        if !self.hard {
            session.soft_delete_files(&self.paths, Utc::now()).await?;
            return Ok(format!("moved {} file(s) to the trash", self.paths.len()));
        }

        let entries = session.fetch_all_entries().await?;
        let mut hashes = Vec::new();
        for target in &self.paths {
            let before = hashes.len();
            hashes.extend(
                entries
                    .iter()
                    .filter(|e| &e.path == target)
                    .map(|e| e.post_hash.clone()),
            );
            if hashes.len() == before {
                return Err(FileError::NotFound(target.clone()).into());
            }
        }
        session.hard_delete_files(&hashes).await?;
        Ok(format!(
            "removed {} entr{} (stored content is orphaned, not erased)",
            hashes.len(),
            if hashes.len() == 1 { "y" } else { "ies" }
        ))
    }
}

#[derive(Args, Debug, Clone)]
pub struct Restore {
    pub path: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Restore {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        session.restore_file(&self.path).await?;
        Ok(format!("restored {}", self.path))
    }
}
