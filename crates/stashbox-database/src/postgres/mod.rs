//! PostgreSQL metadata store.

pub mod store;

pub use store::PgMetadataStore;
