//! Data Models
//!
//! Request/response payloads, conversation records and configuration.

pub mod request;
pub mod session;
pub mod settings;

pub use request::*;
pub use session::*;
pub use settings::*;
