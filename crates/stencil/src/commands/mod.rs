//! Command implementations for the stencil CLI
//!
//! Each command module handles the CLI interface and delegates to
//! stencil-template for the actual work.

pub mod list;
pub mod new;
pub mod render;
pub mod values;
