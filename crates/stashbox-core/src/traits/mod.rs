//! Contract traits implemented by infrastructure crates.

pub mod blob;
