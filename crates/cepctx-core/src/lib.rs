#![forbid(unsafe_code)]
//! cepctx-core: identifiers, errors, stream schemas, extension registry and
//! environment settings shared by every cepctx crate.
//!
//! Nothing in here is synchronized or does I/O. The only registry that stays
//! mutable after a context is distributed is the plan registry, which lives in
//! `cepctx-planner`.

pub mod config;
pub mod error;
pub mod extension;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod schema;

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
