use clap::Args;
use common::drive::path;

use super::{format_size, load_drive, FilesError};

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Drive directory to list
    #[arg(default_value = "/")]
    pub dir: String,

    /// List the trash instead
    #[arg(long)]
    pub trash: bool,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let state = load_drive(&session).await?;
        let (folders, files) = state.list(&self.dir, self.trash);

        if folders.is_empty() && files.is_empty() {
            return Ok(format!("No files in {}", path::normalize_dir(&self.dir)));
        }

        let mut lines: Vec<String> = folders
            .iter()
            .map(|f| format!("{}/", path::file_name(&f.path)))
            .collect();
        for file in files {
            let when = file.deleted_at.unwrap_or(file.created_at);
            let shared = if file.shared_with.is_empty() {
                String::new()
            } else {
                format!("  (shared with {})", file.shared_with.len())
            };
            lines.push(format!(
                "{:>10}  {}  {}{}",
                format_size(file.size),
                when.format("%Y-%m-%d %H:%M"),
                file.name,
                shared
            ));
        }
        Ok(lines.join("\n"))
    }
}
