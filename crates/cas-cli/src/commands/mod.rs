//! One module per subcommand.

pub mod add;
pub mod cat;
pub mod hash;
pub mod init;
pub mod list;
pub mod serve;
pub mod status;
pub mod verify;
