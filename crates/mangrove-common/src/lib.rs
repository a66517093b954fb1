//! Common utilities for mangrove
//!
//! This crate provides the error type shared by the mangrove crates.

pub mod error;

pub use error::{MangroveError, Result};
