use clap::Args;
use common::crypto::Wallet;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Channel to publish on (default: bedrock)
    #[arg(long)]
    pub channel: Option<String>,

    /// Also write logs to a daily rolling file
    #[arg(long)]
    pub log_to_file: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            log_to_file: self.log_to_file,
            ..AppConfig::default()
        };
        if let Some(channel) = &self.channel {
            config.protocol.channel = channel.clone();
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;
        let address = state.load_wallet()?.address();

        Ok(format!(
            "Initialized bedrock directory at: {}\n\
             - Wallet: {} ({})\n\
             - Ledger: {}\n\
             - Config: {}\n\
             - Channel: {}",
            state.bedrock_dir.display(),
            state.wallet_path.display(),
            address,
            state.ledger_path.display(),
            state.config_path.display(),
            state.config.protocol.channel,
        ))
    }
}
