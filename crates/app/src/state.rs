use std::{fs, path::PathBuf};

use common::config::BedrockConfig;
use common::crypto::{LocalWallet, SecretKey};
use common::ledger::{FsLedger, LedgerError};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "bedrock";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const WALLET_FILE_NAME: &str = "wallet.pem";
pub const LEDGER_DIR_NAME: &str = "ledger";
pub const LOG_DIR_NAME: &str = "logs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Protocol settings passed to every session
    #[serde(default)]
    pub protocol: BedrockConfig,
    /// Default log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write logs to a daily rolling file under `logs/`
    #[serde(default)]
    pub log_to_file: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            protocol: BedrockConfig::default(),
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the bedrock directory (~/.bedrock)
    pub bedrock_dir: PathBuf,
    /// Path to the wallet key PEM file
    pub wallet_path: PathBuf,
    /// Root of the local ledger
    pub ledger_path: PathBuf,
    pub log_dir: PathBuf,
    pub config_path: PathBuf,
    pub config: AppConfig,
}

impl AppState {
    /// Get the bedrock directory path (custom or default ~/.bedrock)
    pub fn bedrock_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }
        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    fn paths(bedrock_dir: PathBuf, config: AppConfig) -> Self {
        Self {
            wallet_path: bedrock_dir.join(WALLET_FILE_NAME),
            ledger_path: bedrock_dir.join(LEDGER_DIR_NAME),
            log_dir: bedrock_dir.join(LOG_DIR_NAME),
            config_path: bedrock_dir.join(CONFIG_FILE_NAME),
            bedrock_dir,
            config,
        }
    }

    /// Create a new state directory with a fresh wallet
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let bedrock_dir = Self::bedrock_dir(custom_path)?;
        if bedrock_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let state = Self::paths(bedrock_dir, config.unwrap_or_default());
        fs::create_dir_all(&state.bedrock_dir)?;
        fs::create_dir_all(&state.ledger_path)?;

        let key = SecretKey::generate().map_err(|e| StateError::InvalidKey(e.to_string()))?;
        fs::write(&state.wallet_path, key.to_pem())?;
        fs::write(&state.config_path, toml::to_string_pretty(&state.config)?)?;

        Ok(state)
    }

    /// Load an existing state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let bedrock_dir = Self::bedrock_dir(custom_path)?;
        if !bedrock_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = bedrock_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        let config: AppConfig = toml::from_str(&fs::read_to_string(&config_path)?)?;

        let state = Self::paths(bedrock_dir, config);
        if !state.wallet_path.exists() {
            return Err(StateError::MissingFile(WALLET_FILE_NAME.to_string()));
        }
        Ok(state)
    }

    pub fn load_wallet(&self) -> Result<LocalWallet, StateError> {
        let pem = fs::read_to_string(&self.wallet_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(LocalWallet::new(key))
    }

    pub async fn open_ledger(&self) -> Result<FsLedger, LedgerError> {
        FsLedger::open(&self.ledger_path).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("bedrock directory not initialized. Run 'bedrock init' first")]
    NotInitialized,

    #[error("bedrock directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
