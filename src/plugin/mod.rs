//! The wrapped CNI plugin
//!
//! # Modules
//!
//! - `discovery`: locating the real plugin binary next to the wrapper
//! - `process`: running the plugin with inherited stdio and collecting its exit status
//! - `signals`: forwarding SIGINT/SIGTERM to the plugin while it runs

pub mod discovery;
pub mod process;
pub mod signals;

pub use discovery::resolve_plugin;
pub use process::{ChildOutcome, ChildState, PluginProcess};
