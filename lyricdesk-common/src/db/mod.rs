//! Database models and schema

pub mod init;
pub mod models;
pub mod patch;

pub use init::*;
pub use models::*;
pub use patch::*;
