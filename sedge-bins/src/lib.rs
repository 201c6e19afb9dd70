//! Shared support for the sedge binaries.

pub mod common;
