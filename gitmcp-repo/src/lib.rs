//! gitmcp repository access - issue tracker client and the repository operations
//! exposed as tools
//!
//! The [`IssueTracker`] trait is the seam between the operations and the
//! hosting API, so operations can be driven by an in-memory tracker in tests.

pub mod api;
pub mod operations;
pub mod priority;
pub mod types;

pub use api::{ApiClientConfig, GitHubApiClient, IssueTracker};
pub use operations::*;
pub use priority::*;
pub use types::*;
