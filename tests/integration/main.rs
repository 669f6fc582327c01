//! Integration tests: HTTP surface over the in-memory store with
//! deterministically drained placement tasks.

mod helpers;

mod file_test;
mod folder_test;
mod sweeper_test;
