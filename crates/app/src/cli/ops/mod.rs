pub mod contacts;
pub mod files;
pub mod init;
pub mod version;
pub mod whoami;

pub use contacts::Contacts;
pub use files::Files;
pub use init::Init;
pub use version::Version;
pub use whoami::Whoami;
