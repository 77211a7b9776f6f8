//! # convene-store
//!
//! Persistent storage for Convene, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model.  Several handles may share one database file; multi-statement
//! writes are serialized with `Database::immediate`.

pub mod categories;
pub mod conversations;
pub mod database;
pub mod events;
pub mod images;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reviews;
pub mod users;

mod columns;
mod error;

#[cfg(test)]
mod test_support;

pub use columns::now;
pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
