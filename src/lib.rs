//! t0 - todo.txt store with tracker reconciliation
//!
//! This library provides the core functionality for the t0 CLI tool.
//!
//! # Core Concepts
//!
//! - **Identities**: time-ordered UUIDv7 values with a 22-character short
//!   form (`id:`) and the canonical 36-character form (`uuid:`)
//! - **Ensure**: fills creation/completion dates, identities and default
//!   tags so every task meets the list invariants
//! - **Reconcile**: merges tracker records into the local list, joined on
//!   the `url` tag, never touching local completion or identity
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `config.toml`
//! - `error`: Error types and result aliases
//! - `identity`: Identity generation and short/long codecs
//! - `task`: Task records and ordered lists
//! - `todotxt`: todo.txt line codec and atomic file store
//! - `ensure`: Task property normalization
//! - `reconcile`: Tracker-to-list merge
//! - `trackers`: GitHub, GitLab and OpenProject adapters
//! - `output`: Human and JSON output

pub mod cli;
pub mod config;
pub mod ensure;
pub mod error;
pub mod identity;
pub mod output;
pub mod reconcile;
pub mod task;
pub mod todotxt;
pub mod trackers;

pub use error::{Error, Result};
