//! Integration tests for the autocrew binary
//!
//! These drive the compiled executable from a temporary installation
//! directory and check exit codes, console output and what is left on disk.
//!
//! # Test Organization
//!
//! - `cli` - argument handling, banner, help and crew dispatch errors
//! - `upgrade` - `--upgrade` when no newer release can be found
//!
//! Run with `cargo test --test integration`.

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod upgrade;
