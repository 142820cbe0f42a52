//! Mason build model: configuration records extracted from a build file,
//! the target dependency graph, and backend build-file emission.

pub mod config;
pub mod emit;
pub mod graph;

pub use config::{BuildConfig, DependencyInfo, Target, TargetType};
pub use graph::Graph;
