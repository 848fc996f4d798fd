use clap::Args;

use crate::cli::op::SessionError;

#[derive(Args, Debug, Clone)]
pub struct Whoami;

#[async_trait::async_trait]
impl crate::cli::op::Op for Whoami {
    type Error = SessionError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let session = ctx.session().await?;
        Ok(format!(
            "Wallet:     {}\n\
             Delegate:   {}\n\
             Public key: {}\n\
             Channel:    {}",
            session.address(),
            session.delegate_address(),
            session.public_key(),
            session.ledger().envelope().channel,
        ))
    }
}
