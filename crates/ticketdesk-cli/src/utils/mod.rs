//! Utility functions for terminal output.

pub mod format;

pub use format::render_tickets;
