//! Session lifecycle
//!
//! Authentication lives outside this crate; it only hands us an opaque
//! user identity and login/logout signals. A login builds an [`AppState`]
//! from that user's snapshots, a logout drops it. Storage is never touched
//! on logout, so the next login for the same user sees the same data.
//!
//! Background jobs outlive the view that started them. They commit through a
//! [`CommitTarget`], which finds whichever session currently owns the user
//! instead of writing through a handle that may already be closed.

use crate::config::CoreConfig;
use crate::error::{CoreError, LoadReport};
use crate::event::{EventBus, StateEvent};
use crate::models::{NewProject, Project};
use crate::persistence::SnapshotStore;
use crate::store::AppState;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Opaque identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle signal from the authentication layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    Login(UserId),
    Logout,
}

/// Owns the active [`AppState`], if any
pub struct SessionManager {
    store: Arc<dyn SnapshotStore>,
    config: CoreConfig,
    event_bus: EventBus,
    current: Arc<RwLock<Option<Arc<AppState>>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SnapshotStore>, config: CoreConfig) -> Self {
        let event_bus = EventBus::new(config.event_capacity);
        Self {
            store,
            config,
            event_bus,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Shared bus; survives across sessions
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Start a session for `user`
    ///
    /// Logging in as the already-active user returns the live handle with an
    /// empty report. Logging in as someone else tears the old session down first.
    pub fn login(&self, user: UserId) -> (Arc<AppState>, LoadReport) {
        let mut current = self.current.write();

        if let Some(state) = current.as_ref() {
            if *state.user() == user {
                return (Arc::clone(state), LoadReport::new());
            }
        }

        if let Some(previous) = current.take() {
            self.close(&previous);
        }

        let (state, report) = AppState::load(
            user,
            Arc::clone(&self.store),
            self.config.clone(),
            self.event_bus.clone(),
        );
        let state = Arc::new(state);
        *current = Some(Arc::clone(&state));
        (state, report)
    }

    /// End the active session; returns whose session it was
    pub fn logout(&self) -> Option<UserId> {
        let mut current = self.current.write();
        let previous = current.take()?;
        self.close(&previous);
        Some(previous.user().clone())
    }

    /// Apply a signal from the authentication layer
    pub fn handle(&self, signal: SessionSignal) -> Option<LoadReport> {
        match signal {
            SessionSignal::Login(user) => Some(self.login(user).1),
            SessionSignal::Logout => {
                self.logout();
                None
            }
        }
    }

    /// Handle for the active session
    pub fn current(&self) -> Result<Arc<AppState>, CoreError> {
        self.current
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or(CoreError::NoActiveSession)
    }

    pub fn is_active(&self) -> bool {
        self.current.read().is_some()
    }

    /// Where a job started by the active session should land its results
    pub(crate) fn commit_target(&self) -> Result<CommitTarget, CoreError> {
        let user = self.current()?.user().clone();
        Ok(CommitTarget {
            user,
            current: Arc::clone(&self.current),
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            event_bus: self.event_bus.clone(),
        })
    }

    /// Caller holds the `current` write lock
    fn close(&self, state: &AppState) {
        state.close();
        info!(user = %state.user(), "Session closed");
        self.event_bus
            .publish(StateEvent::SessionClosed(state.user().clone()));
    }
}

/// Late writer for one user's data
///
/// Commits go to the user's live session when there is one. Otherwise the
/// stored snapshots are loaded, changed and saved back. The session slot
/// stays locked for the whole commit, so no login or logout can interleave.
#[derive(Clone)]
pub(crate) struct CommitTarget {
    user: UserId,
    current: Arc<RwLock<Option<Arc<AppState>>>>,
    store: Arc<dyn SnapshotStore>,
    config: CoreConfig,
    event_bus: EventBus,
}

impl CommitTarget {
    pub(crate) fn user(&self) -> &UserId {
        &self.user
    }

    pub(crate) fn commit_generation(&self, data: NewProject) -> Project {
        let current = self.current.write();

        if let Some(state) = current.as_ref().filter(|s| *s.user() == self.user) {
            return state.commit_generation(data);
        }

        debug!(user = %self.user, "No live session, committing to stored snapshots");
        let (state, _) = AppState::restore(
            self.user.clone(),
            Arc::clone(&self.store),
            self.config.clone(),
            self.event_bus.clone(),
        );
        state.commit_generation(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewProject, Plan};
    use crate::persistence::MemorySnapshotStore;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemorySnapshotStore::new()), CoreConfig::default())
    }

    #[test]
    fn test_no_session_before_login() {
        let sessions = manager();
        assert!(!sessions.is_active());
        assert!(matches!(sessions.current(), Err(CoreError::NoActiveSession)));
    }

    #[test]
    fn test_logout_then_login_reloads_same_data() {
        let sessions = manager();
        let (state, _) = sessions.login(UserId::from("alice"));
        let created = state.create_project(NewProject::new("Billing", "Rust"));
        state.upgrade_plan(Plan::Pro);
        drop(state);

        assert_eq!(sessions.logout(), Some(UserId::from("alice")));
        assert!(sessions.current().is_err());

        let (state, report) = sessions.login(UserId::from("alice"));
        assert!(report.fully_restored());
        assert_eq!(state.plan(), Plan::Pro);
        assert_eq!(state.projects()[0].id, created.id);
    }

    #[test]
    fn test_users_are_isolated() {
        let sessions = manager();
        let (alice, _) = sessions.login(UserId::from("alice"));
        alice.upgrade_plan(Plan::Enterprise);

        let (bob, _) = sessions.login(UserId::from("bob"));
        assert_eq!(bob.plan(), Plan::Free);
        assert_eq!(sessions.current().unwrap().user().as_str(), "bob");
    }

    #[test]
    fn test_relogin_same_user_returns_live_handle() {
        let sessions = manager();
        let (first, _) = sessions.login(UserId::from("alice"));
        let (second, _) = sessions.login(UserId::from("alice"));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_closed_handle_stops_writing() {
        let sessions = manager();
        let (stale, _) = sessions.login(UserId::from("alice"));
        sessions.logout();
        assert!(stale.is_closed());

        let (live, _) = sessions.login(UserId::from("alice"));
        live.create_project(NewProject::new("Kept", "Go"));

        // Applies in memory, but must not overwrite the live session's snapshots
        stale.upgrade_plan(Plan::Enterprise);
        assert!(matches!(stale.flush(), Err(CoreError::SessionClosed)));

        drop(live);
        sessions.logout();
        let (reloaded, _) = sessions.login(UserId::from("alice"));
        assert_eq!(reloaded.plan(), Plan::Free);
        assert_eq!(reloaded.projects()[0].name, "Kept");
        assert_eq!(reloaded.usage().projects, 5);
    }

    #[test]
    fn test_handle_signals() {
        let sessions = manager();
        let report = sessions.handle(SessionSignal::Login(UserId::from("carol")));
        assert!(report.is_some());
        assert!(sessions.is_active());

        assert!(sessions.handle(SessionSignal::Logout).is_none());
        assert!(!sessions.is_active());
    }
}
