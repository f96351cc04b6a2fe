//! Operations shared between commands.

pub mod context;
pub mod pipeline;

pub use context::Context;
