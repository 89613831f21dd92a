//! Build status model and the sources that produce it.

pub mod auth;
pub mod snapshot;
pub mod source;

pub use auth::TokenProvider;
pub use snapshot::{BuildSnapshot, BuildStatus, StepState, StepStatus};
pub use source::{CloudBuildSource, StatusSource};
