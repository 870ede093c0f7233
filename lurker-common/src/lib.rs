//! Shared utilities for the Lurker crates.
//!
//! Kept deliberately small so every crate in the workspace (including the
//! HTTP layer) can depend on it without pulling in heavy transitive costs.
//!
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use lurker_common::observability::{LogConfig, LogFormat};
//!
//! let cfg = LogConfig {
//!     format: LogFormat::parse("json"),
//!     ..LogConfig::default()
//! };
//! assert_eq!(cfg.app_name, "lurker");
//! assert!(matches!(cfg.format, LogFormat::Json));
//! ```
pub mod observability;
