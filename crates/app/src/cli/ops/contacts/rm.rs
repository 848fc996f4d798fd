use clap::Args;

use super::ContactsError;

#[derive(Args, Debug, Clone)]
pub struct Rm {
    pub name: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Rm {
    type Error = ContactsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        let contact = session
            .fetch_contacts()
            .await?
            .into_iter()
            .find(|c| c.name == self.name)
            .ok_or_else(|| ContactsError::UnknownContact(self.name.clone()))?;
        session.delete_contact(&contact.public_key).await?;
        Ok(format!("removed contact {}", self.name))
    }
}
