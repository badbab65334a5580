//! upkeep database: SurrealDB connection management, schema migrations,
//! repository implementations and the relation store.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - One repository per record family ([`repository`])
//! - Dependent counts, counter refreshes and guarded deletes
//!   ([`SurrealRelationStore`])
//! - Error types ([`DbError`])

mod connection;
mod error;
mod relation;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use relation::SurrealRelationStore;
pub use schema::run_migrations;
