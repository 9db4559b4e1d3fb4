//! Database models and queries

pub mod categories;
pub mod init;
pub mod migrations;
pub mod models;
pub mod preferences;
pub mod songs;

pub use categories::*;
pub use init::*;
pub use migrations::*;
pub use models::*;
pub use preferences::*;
pub use songs::*;
