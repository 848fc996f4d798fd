use clap::Args;
use common::drive::path;

use super::FilesError;

#[derive(Args, Debug, Clone)]
pub struct Mv {
    pub from: String,
    /// New path, or a directory ending with `/` to keep the name
    pub to: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Mv {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let to = if self.to.ends_with('/') {
            path::join(&self.to, path::file_name(&self.from))
        } else {
            self.to.clone()
        };
        session.move_file(&self.from, &to).await?;
        Ok(format!("moved {} to {}", self.from, to))
    }
}

#[derive(Args, Debug, Clone)]
pub struct MvDir {
    pub from: String,
    pub to: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for MvDir {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let pairs = session.move_folder(&self.from, &self.to).await?;
        if pairs.is_empty() {
            return Ok(format!("no files under {}", path::normalize_dir(&self.from)));
        }
        Ok(pairs
            .iter()
            .map(|(old, new)| format!("moved {old} to {new}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
