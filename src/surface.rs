//! The two independently rendered surfaces.
//!
//! They share no memory: each builds its own registry over the gateway and
//! learns about the other's changes only by refetching.

pub mod main_panel;
pub mod tray;

pub use main_panel::MainSurface;
pub use tray::TraySurface;
