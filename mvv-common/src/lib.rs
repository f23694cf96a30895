//! # Ma Ville Verte Common Library
//!
//! Shared code for the Ma Ville Verte services:
//! - Error types
//! - Configuration loading

pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{Error, Result};
