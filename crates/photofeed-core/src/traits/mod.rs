//! Core traits for the photo feed
//!
//! This module defines the abstract interfaces the store depends on.
//!
//! - [`Transport`]: Execute HTTP requests against the photo API
//! - [`DateParser`]: Resolve wire timestamps into `DateTime<Utc>`

pub mod transport;
pub mod date_parser;

pub use transport::{Transport, execute_json};
pub use date_parser::{DateParser, Rfc3339DateParser};
