pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Contacts, Files, Init, Version, Whoami};
