use std::path::PathBuf;

use clap::Args;
use common::service::FileSource;

use super::{format_failures, FilesError};

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// Local files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Drive directory to upload into
    #[arg(long, default_value = "/")]
    pub dir: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Upload {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;

        let mut sources = Vec::with_capacity(self.files.len());
        for path in &self.files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content = tokio::fs::read(path).await?;
            sources.push(FileSource::new(name, content));
        }

        let uploaded = session.upload_files(&self.dir, sources).await?;
        let saved = session.save_files(uploaded.uploaded).await?;

        let mut lines: Vec<String> = saved
            .saved
            .iter()
            .map(|entry| format!("uploaded {}", entry.path))
            .collect();
        lines.extend(format_failures(&uploaded.failed));
        lines.extend(format_failures(&saved.failed));

        let output = lines.join("\n");
        if uploaded.failed.is_empty() && saved.failed.is_empty() {
            Ok(output)
        } else {
            Err(FilesError::Partial(output))
        }
    }
}
