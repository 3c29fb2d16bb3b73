//! gitmcp core - shared configuration, error and logging infrastructure
//!
//! Every other gitmcp crate builds on the types defined here.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
