use clap::Args;
use common::drive::path;

use super::FilesError;

#[derive(Args, Debug, Clone)]
pub struct Cp {
    pub from: String,
    /// Destination path; defaults to a `_copy` name next to the source
    pub to: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Cp {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let to = match &self.to {
            Some(to) => to.clone(),
            None => {
                let live: Vec<String> = session
                    .fetch_file_entries()
                    .await?
                    .into_iter()
                    .map(|e| e.path)
                    .collect();
                let dir = path::destination_parent(&self.from);
                let name = path::copy_name(path::file_name(&self.from), |candidate| {
                    live.contains(&path::join(&dir, candidate))
                });
                path::join(&dir, &name)
            }
        };
        session.duplicate_file(&self.from, &to).await?;
        Ok(format!("copied {} to {}", self.from, to))
    }
}
