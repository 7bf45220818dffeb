//! Core of the userbot: command routing, chat policy, localization.
//!
//! This crate is intentionally framework-agnostic. The Telegram client lives
//! behind ports (traits) implemented in adapter crates.

pub mod access;
pub mod args;
pub mod audit;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod identity;
pub mod logging;
pub mod message;
pub mod messaging;
pub mod ports;
pub mod registry;
pub mod security;
pub mod store;
pub mod translations;

pub use errors::{Error, Result};
