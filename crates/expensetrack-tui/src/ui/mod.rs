//! Terminal UI module using ratatui.
//!
//! This module provides the TUI rendering and input handling:
//!
//! - `render`: Main frame rendering and layout
//! - `input`: Keyboard event handling
//! - `styles`: Color themes and text styling
//! - `views`: Per-screen content rendering (auth, welcome, expenses, etc.)

pub mod input;
pub mod render;
pub mod styles;
pub mod views;
