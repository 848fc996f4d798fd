use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use common::ledger::{FsLedger, LedgerError};
use common::service::{BedrockService, ServiceError};

use crate::state::{AppState, StateError};

/// A session on the local ledger
pub type Session = BedrockService<FsLedger>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error("failed to open ledger: {0}")]
    Ledger(#[from] LedgerError),
    #[error("failed to open session: {0}")]
    Service(#[from] ServiceError),
}

#[derive(Debug, Clone)]
pub struct OpContext {
    /// Optional custom state path (defaults to ~/.bedrock)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    pub fn state(&self) -> Result<AppState, StateError> {
        AppState::load(self.config_path.clone())
    }

    /// Load the wallet and open a session on the local ledger
    pub async fn session(&self) -> Result<Session, SessionError> {
        let state = self.state()?;
        let wallet = state.load_wallet()?;
        let ledger = Arc::new(state.open_ledger().await?);
        Ok(BedrockService::connect(&wallet, ledger, &state.config.protocol).await?)
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}
