//! Boards data access layer
//!
//! The cloud limits service talks to persistence only through [`BoardsStore`].
//! Two implementations live here: [`PostgresStore`] over a sqlx pool and
//! [`MemoryStore`], which backs fixtures and tests and records the calls it
//! receives.

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::{MemoryFixture, MemoryStore, SentMessage};
pub use postgres::{setup_database, PostgresStore};
pub use store::BoardsStore;
