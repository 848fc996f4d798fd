/**
 * Settings shared by every session.
 */
pub mod config;
/**
 * Cryptographic types and operations.
 *  - Symmetric file keys and IVs (ChaCha20-Poly1305)
 *  - Ed25519 keypairs and wallet-style addresses
 *  - Sealed boxes for wrapping secrets to a public key
 *  - Sub-identity derivation from a wallet signature
 */
pub mod crypto;
/**
 * In-memory view of a drive: files, derived folders,
 *  path helpers and stale-request guards.
 */
pub mod drive;
/**
 * Contract with the decentralized network.
 * Versioned aggregates, immutable posts and blobs,
 *  plus a typed client with conflict-checked
 *  read-modify-write on aggregates.
 */
pub mod ledger;
/**
 * The Bedrock protocol itself: encrypted file
 *  entries, contacts, sharing and delegate
 *  authorization, all on top of a ledger.
 */
pub mod service;
/**
 * Build version information, set at compile time
 *  by the consuming binary.
 */
pub mod version;

pub mod prelude {
    pub use crate::config::BedrockConfig;
    pub use crate::crypto::{LocalWallet, PublicKey, SecretKey, Wallet};
    pub use crate::drive::{DriveFile, DriveState};
    pub use crate::ledger::{Address, FsLedger, ItemHash, Ledger, LedgerProvider, MemoryLedger};
    pub use crate::service::{BedrockService, Contact, DriveSync, FileError, FileSource};
    pub use crate::version::BuildInfo;
}
