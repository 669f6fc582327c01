//! Embedded in-memory metadata store.

pub mod store;

pub use store::MemoryMetadataStore;
