//! # convene-shared
//!
//! Vocabulary shared by every Convene crate: strongly typed identifiers,
//! the conversation status machine's states, and platform-wide limits.

pub mod constants;
pub mod error;
pub mod types;

pub use error::ParseError;
pub use types::*;
