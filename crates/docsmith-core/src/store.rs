//! Per-user application state
//!
//! [`AppState`] is the explicit handle created when a user session begins
//! and dropped at logout. It owns the project registry, the usage meter and
//! the plan manager behind one `parking_lot::RwLock`, so each mutation
//! (including its snapshot write) runs to completion before the next one.
//!
//! Once its session is closed a handle keeps answering reads, but it no
//! longer writes snapshots: a newer session for the same user owns them.

use crate::analytics::DashboardSummary;
use crate::config::CoreConfig;
use crate::error::{CoreError, LoadError, LoadReport, PersistenceHealth};
use crate::event::{EventBus, Notice, StateEvent};
use crate::meter::UsageMeter;
use crate::models::{
    demo_projects, NewProject, Plan, Project, ProjectPatch, UsageIncrement, UsageStats,
};
use crate::persistence::{decode, Domain, Snapshot, SnapshotKey, SnapshotStore};
use crate::plan_manager::{PlanManager, PlanTransition};
use crate::quota::{calculate_quota_status, QuotaStatus};
use crate::registry::{ProjectQuery, ProjectRegistry};
use crate::session::UserId;
use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The three domains, mutated together under one lock
#[derive(Debug, Clone)]
struct Domains {
    registry: ProjectRegistry,
    meter: UsageMeter,
    plans: PlanManager,
}

pub struct AppState {
    user: UserId,
    config: CoreConfig,
    store: Arc<dyn SnapshotStore>,
    domains: RwLock<Domains>,
    event_bus: EventBus,
    health: RwLock<PersistenceHealth>,
    closed: AtomicBool,
}

impl AppState {
    /// Load (or seed) every domain for `user`
    ///
    /// Never fails: unreadable snapshots fall back to defaults and are
    /// listed in the returned report.
    pub fn load(
        user: UserId,
        store: Arc<dyn SnapshotStore>,
        config: CoreConfig,
        event_bus: EventBus,
    ) -> (Self, LoadReport) {
        let (state, report) = Self::restore(user, store, config, event_bus);

        state
            .event_bus
            .publish(StateEvent::SessionLoaded(state.user.clone()));

        info!(
            user = %state.user,
            projects_loaded = report.projects_loaded,
            usage_loaded = report.usage_loaded,
            plan_loaded = report.plan_loaded,
            errors = report.errors.len(),
            "User state ready"
        );

        (state, report)
    }

    /// Same as [`AppState::load`] without announcing a session
    pub(crate) fn restore(
        user: UserId,
        store: Arc<dyn SnapshotStore>,
        config: CoreConfig,
        event_bus: EventBus,
    ) -> (Self, LoadReport) {
        let mut report = LoadReport::new();
        let mut write_back = Vec::new();

        info!(user = %user, "Loading user state");

        let plan = match load_domain::<Plan>(store.as_ref(), &user, Domain::Plan, &mut report) {
            Some(plan) => {
                report.plan_loaded = true;
                plan
            }
            None => {
                write_back.push(Domain::Plan);
                Plan::default()
            }
        };

        let registry =
            match load_domain::<Vec<Project>>(store.as_ref(), &user, Domain::Projects, &mut report)
            {
                Some(projects) => {
                    report.projects_loaded = true;
                    ProjectRegistry::from_projects(projects)
                }
                None => {
                    write_back.push(Domain::Projects);
                    if config.seed_demo_projects {
                        ProjectRegistry::from_projects(demo_projects(Utc::now()))
                    } else {
                        ProjectRegistry::new()
                    }
                }
            };

        let mut meter =
            match load_domain::<UsageStats>(store.as_ref(), &user, Domain::Usage, &mut report) {
                Some(stats) => {
                    report.usage_loaded = true;
                    UsageMeter::new(stats)
                }
                None => {
                    write_back.push(Domain::Usage);
                    let mut stats = if config.seed_demo_projects {
                        UsageStats::default()
                    } else {
                        UsageStats::empty(plan)
                    };
                    stats.projects = registry.len() as u64;
                    UsageMeter::new(stats)
                }
            };

        report.seeded = write_back.iter().map(|d| d.to_string()).collect();

        // The registry wins, e.g. after a lost projects snapshot was reseeded
        let registered = registry.len() as u64;
        let counted = meter.stats().projects;
        if counted != registered {
            warn!(
                user = %user,
                counted,
                registered,
                "Project counter did not match registry, corrected"
            );
            report.add_warning(
                Domain::Usage.as_str(),
                format!("Project counter was {counted}, corrected to {registered}"),
            );
            meter.set_project_count(registered);
            if !write_back.contains(&Domain::Usage) {
                write_back.push(Domain::Usage);
            }
        }

        let plans = PlanManager::new(plan);
        if plans.reconcile(&mut meter) {
            warn!(user = %user, plan = %plan, "Usage limits did not match plan, corrected");
            if !write_back.contains(&Domain::Usage) {
                write_back.push(Domain::Usage);
            }
        }

        let state = Self {
            user,
            config,
            store,
            domains: RwLock::new(Domains {
                registry,
                meter,
                plans,
            }),
            event_bus,
            health: RwLock::new(PersistenceHealth::Healthy),
            closed: AtomicBool::new(false),
        };

        if !write_back.is_empty() {
            let domains = state.domains.read();
            state.persist(&domains, &write_back);
        }

        (state, report)
    }

    pub fn user(&self) -> &UserId {
        &self.user
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Get the event bus for subscribing to updates
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn health(&self) -> PersistenceHealth {
        self.health.read().clone()
    }

    /// True once the owning session has ended
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop writing snapshots; waits for an in-flight mutation to finish
    pub(crate) fn close(&self) {
        let _domains = self.domains.write();
        self.closed.store(true, Ordering::Release);
    }

    // ===================
    // Read accessors
    // ===================

    /// All projects, newest first
    pub fn projects(&self) -> Vec<Project> {
        self.domains.read().registry.as_slice().to_vec()
    }

    pub fn project(&self, id: &str) -> Option<Project> {
        self.domains.read().registry.get(id).cloned()
    }

    pub fn find_projects(&self, query: &ProjectQuery) -> Vec<Project> {
        self.domains.read().registry.find(query).cloned().collect()
    }

    pub fn languages(&self) -> Vec<String> {
        self.domains.read().registry.languages()
    }

    pub fn usage(&self) -> UsageStats {
        self.domains.read().meter.snapshot()
    }

    pub fn plan(&self) -> Plan {
        self.domains.read().plans.current()
    }

    pub fn quota(&self) -> QuotaStatus {
        calculate_quota_status(self.domains.read().meter.stats(), &self.config)
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary::from_usage(self.domains.read().meter.stats())
    }

    // ===================
    // Mutations
    // ===================

    /// Create a project at the front of the registry
    ///
    /// Counts one more project and one more generated document.
    pub fn create_project(&self, data: NewProject) -> Project {
        let project = {
            let mut domains = self.domains.write();
            let project = domains.registry.create(data, Utc::now());
            domains.meter.record_project_created();
            self.persist(&domains, &[Domain::Projects, Domain::Usage]);
            project
        };

        debug!(user = %self.user, project_id = %project.id, "Project created");
        self.event_bus
            .publish(StateEvent::ProjectCreated(project.id.clone()));
        self.event_bus.publish(StateEvent::UsageChanged);
        project
    }

    /// Merge `patch` into a project; unknown ids are ignored
    pub fn update_project(&self, id: &str, patch: ProjectPatch) -> bool {
        let updated = {
            let mut domains = self.domains.write();
            let updated = domains.registry.update(id, patch, Utc::now());
            if updated {
                self.persist(&domains, &[Domain::Projects]);
            }
            updated
        };

        if updated {
            debug!(user = %self.user, project_id = id, "Project updated");
            self.event_bus.publish(StateEvent::ProjectUpdated(id.into()));
        } else {
            debug!(user = %self.user, project_id = id, "Update ignored, no such project");
        }
        updated
    }

    /// Remove a project; unknown ids are ignored and leave the counter alone
    pub fn delete_project(&self, id: &str) -> bool {
        let removed = {
            let mut domains = self.domains.write();
            let removed = domains.registry.delete(id);
            if removed.is_some() {
                domains.meter.record_project_deleted();
                self.persist(&domains, &[Domain::Projects, Domain::Usage]);
            }
            removed
        };

        match removed {
            Some(project) => {
                debug!(user = %self.user, project_id = id, "Project deleted");
                self.event_bus
                    .publish(StateEvent::ProjectDeleted(project.id));
                self.event_bus.publish(StateEvent::UsageChanged);
                self.event_bus
                    .notify(Notice::success("Project deleted successfully"));
                true
            }
            None => {
                debug!(user = %self.user, project_id = id, "Delete ignored, no such project");
                false
            }
        }
    }

    /// Add to a usage counter; exceeding the plan limit is allowed
    pub fn increment_usage(&self, increment: UsageIncrement) -> Result<(), CoreError> {
        {
            let mut domains = self.domains.write();
            domains.meter.increment(increment)?;
            self.persist(&domains, &[Domain::Usage]);
        }

        debug!(user = %self.user, kind = increment.kind(), "Usage incremented");
        self.event_bus.publish(StateEvent::UsageChanged);
        Ok(())
    }

    /// Switch plans; limits change immediately, counters are untouched
    pub fn upgrade_plan(&self, target: Plan) -> PlanTransition {
        let transition = {
            let mut domains = self.domains.write();
            let Domains { meter, plans, .. } = &mut *domains;
            let transition = plans.upgrade(target, meter);
            self.persist(&domains, &[Domain::Plan, Domain::Usage]);
            transition
        };

        info!(
            user = %self.user,
            from = %transition.from,
            to = %transition.to,
            "Plan changed"
        );
        self.event_bus.publish(StateEvent::PlanChanged {
            from: transition.from,
            to: transition.to,
        });
        self.event_bus.publish(StateEvent::UsageChanged);
        self.event_bus.notify(Notice::success(format!(
            "Successfully upgraded to {} plan!",
            transition.to.display_name()
        )));
        transition
    }

    /// Commit a finished generation: new project plus its usage charge,
    /// persisted as one batch
    pub(crate) fn commit_generation(&self, data: NewProject) -> Project {
        let api_calls = self.config.generation_api_calls;
        let storage = self.config.generation_storage_gb;

        let project = {
            let mut domains = self.domains.write();
            let project = domains.registry.create(data, Utc::now());
            domains.meter.record_project_created();
            if let Err(e) = domains.meter.increment(UsageIncrement::ApiCalls(api_calls)) {
                warn!(error = %e, "Skipping api call charge");
            }
            if let Err(e) = domains.meter.increment(UsageIncrement::Storage(storage)) {
                warn!(error = %e, "Skipping storage charge");
            }
            self.persist(&domains, &[Domain::Projects, Domain::Usage]);
            project
        };

        info!(user = %self.user, project_id = %project.id, "Generation committed");
        self.event_bus
            .publish(StateEvent::ProjectCreated(project.id.clone()));
        self.event_bus.publish(StateEvent::UsageChanged);
        project
    }

    /// Rewrite every domain; clears an unsaved state on success
    pub fn flush(&self) -> Result<(), CoreError> {
        let domains = self.domains.read();
        if self.is_closed() {
            return Err(CoreError::SessionClosed);
        }
        let snapshots = self.encode(&domains, &Domain::ALL)?;
        self.store.save_batch(&snapshots)?;
        *self.health.write() = PersistenceHealth::Healthy;
        Ok(())
    }

    /// Write the given domains; failures are logged and tracked, never raised
    fn persist(&self, domains: &Domains, which: &[Domain]) {
        if self.is_closed() {
            warn!(user = %self.user, "Session closed, change kept in memory only");
            return;
        }

        let result = self
            .encode(domains, which)
            .and_then(|snapshots| self.store.save_batch(&snapshots));

        let mut health = self.health.write();
        match result {
            Ok(()) => {
                if let PersistenceHealth::Unsaved { domains: pending, .. } = &mut *health {
                    pending.retain(|d| !which.iter().any(|w| w.as_str() == d));
                    if pending.is_empty() {
                        *health = PersistenceHealth::Healthy;
                    }
                }
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "Failed to persist state");
                let mut pending = match &*health {
                    PersistenceHealth::Unsaved { domains, .. } => domains.clone(),
                    PersistenceHealth::Healthy => Vec::new(),
                };
                for domain in which {
                    if !pending.iter().any(|d| d == domain.as_str()) {
                        pending.push(domain.to_string());
                    }
                }
                *health = PersistenceHealth::Unsaved {
                    domains: pending,
                    reason: e.to_string(),
                };
            }
        }
    }

    fn encode(&self, domains: &Domains, which: &[Domain]) -> Result<Vec<Snapshot>, CoreError> {
        which
            .iter()
            .map(|&domain| {
                let key = SnapshotKey::new(&self.user, domain);
                match domain {
                    Domain::Projects => Snapshot::encode(key, &domains.registry.as_slice()),
                    Domain::Plan => Snapshot::encode(key, &domains.plans.current()),
                    Domain::Usage => Snapshot::encode(key, domains.meter.stats()),
                }
            })
            .collect()
    }
}

/// Read one domain; `None` means "use defaults"
fn load_domain<T: DeserializeOwned>(
    store: &dyn SnapshotStore,
    user: &UserId,
    domain: Domain,
    report: &mut LoadReport,
) -> Option<T> {
    let key = SnapshotKey::new(user, domain);
    let raw = match store.load(&key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(key = %key, "No snapshot, using defaults");
            return None;
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to read snapshot");
            report.add_error(LoadError::from_core_error(domain.as_str(), &e));
            return None;
        }
    };

    match decode(&key, &raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key = %key, error = %e, "Malformed snapshot, treating as absent");
            report.add_error(LoadError::from_core_error(domain.as_str(), &e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectStatus;
    use crate::persistence::MemorySnapshotStore;

    fn fresh(store: Arc<MemorySnapshotStore>) -> AppState {
        fresh_for(store, &UserId::from("alice"))
    }

    fn fresh_for(store: Arc<MemorySnapshotStore>, user: &UserId) -> AppState {
        let (state, _) = AppState::load(
            user.clone(),
            store,
            CoreConfig::default(),
            EventBus::default_capacity(),
        );
        state
    }

    /// Store that rejects every write
    struct ReadOnlyStore;

    impl SnapshotStore for ReadOnlyStore {
        fn load(&self, _key: &SnapshotKey) -> Result<Option<String>, CoreError> {
            Ok(None)
        }

        fn save_batch(&self, _snapshots: &[Snapshot]) -> Result<(), CoreError> {
            Err(CoreError::LockPoisoned)
        }

        fn remove_user(&self, _user: &UserId) -> Result<usize, CoreError> {
            Ok(0)
        }
    }

    #[test]
    fn test_first_login_seeds_and_persists() {
        let store = Arc::new(MemorySnapshotStore::new());
        let (state, report) = AppState::load(
            UserId::from("alice"),
            store.clone(),
            CoreConfig::default(),
            EventBus::default_capacity(),
        );

        assert_eq!(state.projects().len(), 4);
        assert_eq!(state.usage(), UsageStats::default());
        assert_eq!(state.plan(), Plan::Free);
        assert!(!report.has_errors());
        assert_eq!(report.seeded.len(), 3);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_no_seed_config() {
        let store = Arc::new(MemorySnapshotStore::new());
        let config = CoreConfig {
            seed_demo_projects: false,
            ..Default::default()
        };
        let (state, _) = AppState::load(
            UserId::from("bob"),
            store,
            config,
            EventBus::default_capacity(),
        );

        assert!(state.projects().is_empty());
        assert_eq!(state.usage(), UsageStats::empty(Plan::Free));
    }

    #[test]
    fn test_create_and_delete_track_counter() {
        let state = fresh(Arc::new(MemorySnapshotStore::new()));

        let project = state.create_project(NewProject::new("Billing", "Rust"));
        assert_eq!(state.projects()[0].id, project.id);
        assert_eq!(state.usage().projects, 5);
        assert_eq!(state.usage().documents_generated, 13);

        assert!(state.delete_project(project.id.as_str()));
        assert_eq!(state.usage().projects, 4);
        // documents generated is a lifetime count
        assert_eq!(state.usage().documents_generated, 13);
    }

    #[test]
    fn test_delete_missing_changes_nothing() {
        let state = fresh(Arc::new(MemorySnapshotStore::new()));
        let before = (state.projects(), state.usage());

        assert!(!state.delete_project("does-not-exist"));
        assert_eq!((state.projects(), state.usage()), before);
    }

    #[test]
    fn test_update_failed_status() {
        let state = fresh(Arc::new(MemorySnapshotStore::new()));
        let before = state.project("2").unwrap();

        assert!(state.update_project("2", ProjectPatch::status(ProjectStatus::Failed)));

        let after = state.project("2").unwrap();
        assert_eq!(after.status, ProjectStatus::Failed);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.last_modified > before.last_modified);
        assert!(!state.update_project("missing", ProjectPatch::default()));
    }

    #[test]
    fn test_upgrade_from_seed_keeps_counters() {
        let state = fresh(Arc::new(MemorySnapshotStore::new()));
        state.upgrade_plan(Plan::Pro);

        let usage = state.usage();
        assert_eq!(state.plan(), Plan::Pro);
        assert_eq!(usage.max_api_calls, 5000);
        assert_eq!(usage.api_calls, 23);
    }

    #[test]
    fn test_increment_usage_persists() {
        let store = Arc::new(MemorySnapshotStore::new());
        let state = fresh(store.clone());

        state.increment_usage(UsageIncrement::ApiCalls(30)).unwrap();
        assert_eq!(state.usage().api_calls, 53);

        let key = SnapshotKey::new(state.user(), Domain::Usage);
        let stored: UsageStats = decode(&key, &store.raw(&key).unwrap()).unwrap();
        assert_eq!(stored.api_calls, 53);
    }

    #[test]
    fn test_malformed_snapshot_falls_back() {
        let store = Arc::new(MemorySnapshotStore::new());
        let user = UserId::from("alice");
        store.put_raw(&SnapshotKey::new(&user, Domain::Usage), "{broken");
        store.put_raw(&SnapshotKey::new(&user, Domain::Plan), "\"pro\"");

        let (state, report) = AppState::load(
            user,
            store,
            CoreConfig::default(),
            EventBus::default_capacity(),
        );

        assert_eq!(report.warnings().count(), 1);
        assert!(report.plan_loaded);
        assert!(!report.usage_loaded);
        // seeded usage takes the pro limits
        assert_eq!(state.usage().max_api_calls, 5000);
        assert_eq!(state.usage().api_calls, 23);
    }

    #[test]
    fn test_reseeded_projects_resync_counter() {
        let store = Arc::new(MemorySnapshotStore::new());
        let user = UserId::from("bob");
        {
            let state = fresh_for(store.clone(), &user);
            state.create_project(NewProject::new("a", "Go"));
            state.create_project(NewProject::new("b", "Go"));
            assert_eq!(state.usage().projects, 6);
        }
        store.put_raw(&SnapshotKey::new(&user, Domain::Projects), "[{");

        let (state, report) = AppState::load(
            user.clone(),
            store.clone(),
            CoreConfig::default(),
            EventBus::default_capacity(),
        );

        assert_eq!(state.projects().len(), 4);
        assert_eq!(state.usage().projects, 4);
        assert_eq!(report.warnings().count(), 2);

        // The corrected counter was written back
        let key = SnapshotKey::new(&user, Domain::Usage);
        let stored: UsageStats = decode(&key, &store.raw(&key).unwrap()).unwrap();
        assert_eq!(stored.projects, 4);
        assert_eq!(stored.documents_generated, 14);
    }

    #[test]
    fn test_write_failure_marks_unsaved_but_mutates() {
        let (state, _) = AppState::load(
            UserId::from("alice"),
            Arc::new(ReadOnlyStore),
            CoreConfig::default(),
            EventBus::default_capacity(),
        );

        assert!(!state.health().is_healthy());
        state.upgrade_plan(Plan::Enterprise);
        assert_eq!(state.plan(), Plan::Enterprise);

        match state.health() {
            PersistenceHealth::Unsaved { domains, .. } => {
                assert!(domains.contains(&"plan".to_string()));
            }
            PersistenceHealth::Healthy => panic!("expected unsaved state"),
        }
        assert!(state.flush().is_err());
    }

    #[tokio::test]
    async fn test_mutations_publish_events() {
        let state = fresh(Arc::new(MemorySnapshotStore::new()));
        let mut rx = state.event_bus().subscribe();

        state.upgrade_plan(Plan::Pro);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            StateEvent::PlanChanged { from: Plan::Free, to: Plan::Pro }
        ));
        assert!(matches!(rx.recv().await.unwrap(), StateEvent::UsageChanged));
        match rx.recv().await.unwrap() {
            StateEvent::Notice(notice) => {
                assert_eq!(notice.message, "Successfully upgraded to Pro plan!")
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
