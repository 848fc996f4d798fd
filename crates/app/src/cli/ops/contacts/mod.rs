use clap::{Args, Subcommand};

pub mod add;
pub mod ls;
pub mod rm;

use common::service::ContactError;

use crate::cli::op::{Op, SessionError};

crate::command_enum! {
    (Add, add::Add),
    (Ls, ls::Ls),
    (Rm, rm::Rm),
}

pub type ContactsCommand = Command;

#[derive(Args, Debug, Clone)]
pub struct Contacts {
    #[command(subcommand)]
    pub command: ContactsCommand,
}

#[async_trait::async_trait]
impl Op for Contacts {
    type Error = OpError;
    type Output = OpOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        self.command.execute(ctx).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ContactsError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("no contact named {0}")]
    UnknownContact(String),
}
