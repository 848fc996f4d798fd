use clap::Args;

use super::ContactsError;

#[derive(Args, Debug, Clone)]
pub struct Ls;

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = ContactsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let contacts = session.fetch_contacts().await?;
        if contacts.is_empty() {
            return Ok("No contacts".to_string());
        }
        Ok(contacts
            .iter()
            .map(|c| format!("{} (address: {} | key: {})", c.name, c.address, c.public_key))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
