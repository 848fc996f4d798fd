//! Client-side view of a drive
//!
//! Nothing in here talks to the ledger. [`DriveState`] is rebuilt from the
//! ledger on every load and kept in step with successful mutations.

mod generation;
pub mod path;
mod state;

pub use generation::{Generation, Ticket};
pub use path::PathError;
pub use state::{DriveFile, DriveFolder, DriveState};
