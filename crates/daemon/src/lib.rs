//! # Treeserve Daemon Library
//!
//! This crate provides the HTTP-facing service around the [`vfs`] core,
//! exposing a local or FTP-hosted file tree for browsing and download.
//!
//! ## Overview
//!
//! - **Configuration**: TOML file with sane defaults, environment overrides
//!   and startup validation
//! - **Routes**: `/list/{path}` for JSON directory listings,
//!   `/download/{path}` for streamed attachments, `/` redirecting to the
//!   root listing
//! - **Error contract**: core errors map onto a fixed status-code taxonomy
//!   (404 not found, 406 wrong entry kind, 500 everything else)
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                axum Router                    │
//! │   GET /  ·  GET /list/{path}  ·  /download/   │
//! ├───────────────────────────────────────────────┤
//! │            Arc<dyn vfs::Backend>              │
//! │       LocalBackend         FtpBackend         │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`routes`]: HTTP routes and error-to-status mapping

pub mod config;
pub mod routes;

pub use config::{BackendKind, Config};
pub use routes::router;
