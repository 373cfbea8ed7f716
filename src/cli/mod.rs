//! CLI command handling

pub mod history;
pub mod init_db;
pub mod input;
pub mod output;
pub mod push;

pub use history::*;
pub use init_db::*;
pub use input::*;
pub use output::*;
pub use push::*;
