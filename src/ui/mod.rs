//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `render` - View rendering dispatch
//! - `helpers` - Card and metadata formatting
//! - `posts` - Feed list widget
//! - `detail` - Post detail widget
//! - `status` - Status bar widget

mod detail;
mod events;
mod helpers;
mod input;
mod loop_runner;
mod posts;
mod render;
mod status;

// Re-export the public API
pub use loop_runner::{run, Action};
