//! Vidsync - keeps a video catalog in step with directories on disk.
//!
//! This library crate exposes the core functionality for integration testing.

pub mod bootstrap;
pub mod config;
pub mod server;
pub mod streaming;
pub mod sync;
