use clap::Args;
use common::crypto::PublicKey;
use common::ledger::Address;

use super::ContactsError;

#[derive(Args, Debug, Clone)]
pub struct Add {
    pub name: String,

    /// The contact's wallet address
    #[arg(long)]
    pub address: String,

    /// The contact's public key, as printed by `bedrock whoami`
    #[arg(long)]
    pub public_key: String,
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Add {
    type Error = ContactsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let address: Address = self
            .address
            .parse()
            .map_err(|e| ContactsError::InvalidArgument(format!("address: {e}")))?;
        let public_key = PublicKey::from_hex(&self.public_key)
            .map_err(|e| ContactsError::InvalidArgument(format!("public key: {e}")))?;

        let session = ctx.session().await?;
        session
            .create_contact(&self.name, address.clone(), public_key)
            .await?;
        Ok(format!("added contact {} ({})", self.name, address))
    }
}
