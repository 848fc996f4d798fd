use std::path::PathBuf;

use clap::Args;
use common::service::FileError;

use super::{load_drive, FilesError};

#[derive(Args, Debug, Clone)]
pub struct Cat {
    /// Drive path of the file
    pub path: String,

    /// Write the content to this local file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Cat {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let state = load_drive(&session).await?;
        let file = state
            .live_files()
            .find(|f| f.path == self.path)
            .ok_or_else(|| FileError::NotFound(self.path.clone()))?;

        let content = session.download_file(file).await?;
        match &self.output {
            Some(output) => {
                tokio::fs::write(output, &content).await?;
                Ok(format!(
                    "wrote {} bytes to {}",
                    content.len(),
                    output.display()
                ))
            }
            None => Ok(String::from_utf8_lossy(&content).into_owned()),
        }
    }
}
