//! Data models for docsmith

pub mod plan;
pub mod project;
pub mod usage;

pub use plan::{Plan, PlanLimits};
pub use project::{
    demo_projects, format_size, NewProject, Project, ProjectId, ProjectPatch, ProjectStatus,
    DEFAULT_SIZE,
};
pub use usage::{UsageIncrement, UsageStats};
