//! # LyricDesk Common Library
//!
//! Shared code for the LyricDesk services:
//! - Catalog and profile data models
//! - SQLite schema initialization for local mode
//! - Configuration loading (CLI > ENV > TOML > defaults)
//! - The common error type

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
