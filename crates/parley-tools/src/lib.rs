//! # parley-tools
//!
//! The tool system for the Parley session engine.
//!
//! - [`ParleyTool`] — the trait every tool implements, including the
//!   `requires_confirmation` flag that drives human-in-the-loop approval
//! - [`ToolRegistry`] — static name → tool configuration handed to the
//!   engine at construction
//! - Built-in demo tools: [`LocalTimeTool`] (auto-executing) and
//!   [`WeatherTool`] (confirmation-required)
//! - [`testutil`] — scripted tools for engine tests

#![deny(unsafe_code)]

pub mod builtin;
pub mod errors;
pub mod registry;
pub mod testutil;
pub mod traits;

pub use builtin::{LocalTimeTool, WeatherTool};
pub use errors::ToolError;
pub use registry::ToolRegistry;
pub use traits::{ParleyTool, ToolContext};
