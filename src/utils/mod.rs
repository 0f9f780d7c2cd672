//! Utilities
//!
//! Common utilities used throughout the application.

pub mod error;
pub mod json;
pub mod paths;

pub use error::*;
pub use json::extract_json_object;
pub use paths::*;
