use clap::Args;

use super::{find_contact, format_size, FilesError};

#[derive(Args, Debug, Clone)]
pub struct Share {
    pub path: String,
    /// Name of the contact to share with
    pub contact: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Share {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let contact = find_contact(&session, &self.contact).await?;
        let share_hash = session.share_file(&self.path, &contact).await?;
        Ok(format!(
            "shared {} with {} (share {})",
            self.path, contact.name, share_hash
        ))
    }
}

#[derive(Args, Debug, Clone)]
pub struct Unshare {
    pub path: String,
    pub contact: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Unshare {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let contact = find_contact(&session, &self.contact).await?;
        session.unshare_file(&self.path, &contact.public_key).await?;
        Ok(format!(
            "stopped sharing {} with {}; keys already shared cannot be revoked",
            self.path, contact.name
        ))
    }
}

/// List files shared with us
#[derive(Args, Debug, Clone)]
pub struct Shared {
    /// Only show files from this contact
    pub contact: Option<String>,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Shared {
    type Error = FilesError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let contacts = match &self.contact {
            Some(name) => vec![find_contact(&session, name).await?],
            None => session.fetch_contacts().await?,
        };

        let mut lines = Vec::new();
        for contact in &contacts {
            for file in session.fetch_files_shared_by(contact).await? {
                lines.push(format!(
                    "{:>10}  {}  {}",
                    format_size(file.size),
                    contact.name,
                    file.path
                ));
            }
        }
        if lines.is_empty() {
            return Ok("No shared files".to_string());
        }
        Ok(lines.join("\n"))
    }
}
