//! # stashbox-entity
//!
//! Domain entity models for Stashbox: folders with materialized paths and
//! files with write-ahead upload status.

pub mod file;
pub mod folder;
