//! Command handlers
//!
//! Plain async functions the front-end invokes. Commands are organized into
//! modules based on their functionality.

pub mod download;
pub mod system;

// Re-export all command functions for easy access
pub use download::*;
pub use system::*;
