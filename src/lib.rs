//! Client-side coordination for switching file workspaces ("desktops").
//!
//! The backend service owns all workspace state. This crate keeps the main
//! panel and the tray popup consistent with it: per-surface caches rebuilt by
//! refetching, optimistic switching guarded by attempt tokens, and hotkey
//! pushes resolved against live data.

pub mod actor;
pub mod client;
pub mod common;
pub mod gateway;
pub mod model;
pub mod surface;
