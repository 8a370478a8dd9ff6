//! Core domain + application logic for the document print bot.
//!
//! This crate is intentionally framework-agnostic. Telegram and the system
//! print spooler live behind ports (traits) implemented in adapter crates.

pub mod cleanup;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod messaging;
pub mod print;
pub mod retriever;
pub mod service;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
