//! docsmith-core - Core library for docsmith
//!
//! Tracks a user's documentation projects, usage metering and subscription
//! plan, and persists each of them as per-user snapshots.

pub mod analytics;
pub mod config;
pub mod error;
pub mod event;
pub mod generation;
pub mod meter;
pub mod models;
pub mod persistence;
pub mod plan_manager;
pub mod quota;
pub mod registry;
pub mod session;
pub mod store;

pub use config::CoreConfig;
pub use error::{CoreError, LoadReport, PersistenceHealth};
pub use event::{EventBus, Notice, NoticeLevel, StateEvent};
pub use generation::{
    spawn_generation, DocGenerator, GenerationHandle, GenerationRequest, MockGenerator,
};
pub use persistence::{MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore};
pub use registry::ProjectQuery;
pub use session::{SessionManager, SessionSignal, UserId};
pub use store::AppState;
