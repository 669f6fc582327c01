//! # stashbox-database
//!
//! The metadata store: a transactional row store for folders and files
//! with unique constraints, row-level locking, and single-statement bulk
//! prefix-scoped updates.
//!
//! The [`contract`] module defines the store as seen by the services; the
//! [`memory`] module provides an embedded serializable implementation and
//! [`postgres`] a PostgreSQL implementation over `sqlx`.

pub mod connection;
pub mod contract;
pub mod memory;
pub mod postgres;

pub use contract::{CommitHook, MetadataStore, MetadataTx};
pub use memory::MemoryMetadataStore;
pub use postgres::PgMetadataStore;
