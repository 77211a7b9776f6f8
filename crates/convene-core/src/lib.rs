//! # convene-core
//!
//! The rules of the Convene platform on top of `convene-store`: the
//! conversation engine (attendance requests, host decisions and the capacity
//! bookkeeping they imply), the message ledger, the review ledger, and thin
//! facades over users and the event catalog.
//!
//! Every operation takes the acting user explicitly.  An [`Engine`] owns one
//! database connection and is synchronous; callers that need parallelism open
//! one engine per thread on the same database file.

pub mod catalog;
pub mod conversations;
pub mod error;
pub mod messages;
pub mod policy;
pub mod reviews;
pub mod users;

use std::path::Path;

use convene_store::Database;

pub use catalog::{EventDetails, EventDraft, EventFilter, NewImage};
pub use conversations::{
    ConfirmedEvent, ConversationSummary, Counterpart, EventCapacity, EventConversations,
    SubmitOutcome, Thread, TransitionOutcome,
};
pub use error::{CoreError, Result};
pub use policy::{CapacityPolicy, Policy};
pub use reviews::ReviewUpdate;
pub use users::{NewUser, ProfileUpdate};

/// Entry point for every business operation.
pub struct Engine {
    db: Database,
    policy: Policy,
}

impl Engine {
    pub fn new(db: Database, policy: Policy) -> Self {
        Self { db, policy }
    }

    /// Open an engine on the database file at `path`, creating and migrating
    /// it when needed.
    pub fn open_at(path: &Path, policy: Policy) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?, policy))
    }

    pub fn open_in_memory(policy: Policy) -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, policy))
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }
}
