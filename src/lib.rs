//! granter library crate.
//!
//! Provides an OAuth 2.0 authorization server core: pluggable grant handlers
//! chained behind a provider, with storage and token strategies supplied by
//! the embedding application.

pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod storage;
