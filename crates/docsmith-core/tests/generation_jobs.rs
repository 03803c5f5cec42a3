//! Generation job tests
//!
//! Time is paused so the fixed generation delay elapses instantly.

use docsmith_core::models::{NewProject, ProjectStatus, UsageIncrement};
use docsmith_core::{
    spawn_generation, CoreConfig, CoreError, GenerationRequest, MemorySnapshotStore,
    MockGenerator, NoticeLevel, SessionManager, StateEvent, UserId,
};
use std::sync::Arc;
use std::time::Duration;

fn session() -> (SessionManager, Arc<docsmith_core::AppState>) {
    let sessions = SessionManager::new(Arc::new(MemorySnapshotStore::new()), CoreConfig::default());
    let (state, _) = sessions.login(UserId::from("alice"));
    (sessions, state)
}

fn generator() -> Arc<MockGenerator> {
    Arc::new(MockGenerator::new(Duration::from_secs(3)))
}

#[tokio::test(start_paused = true)]
async fn test_completed_generation_commits_project_and_usage() {
    let (sessions, state) = session();
    let before = state.usage();

    let request = GenerationRequest::new("def main(): pass", "python", "Scraper");
    let handle = spawn_generation(&sessions, generator(), request).unwrap();
    assert_eq!(handle.project_name(), "Scraper");

    let project = handle.wait().await.unwrap();

    assert_eq!(state.projects()[0].id, project.id);
    assert_eq!(project.status, ProjectStatus::Completed);
    assert!(project
        .documentation
        .as_deref()
        .unwrap()
        .starts_with("# Scraper Documentation"));

    let after = state.usage();
    assert_eq!(after.api_calls, before.api_calls + 1);
    assert!((after.storage - (before.storage + 0.1)).abs() < 1e-9);
    assert_eq!(after.projects, before.projects + 1);
    assert_eq!(after.documents_generated, before.documents_generated + 1);
}

#[tokio::test(start_paused = true)]
async fn test_validation_failure_mutates_nothing() {
    let (sessions, state) = session();
    let mut rx = state.event_bus().subscribe();
    let projects = state.projects();
    let usage = state.usage();

    let result = spawn_generation(
        &sessions,
        generator(),
        GenerationRequest::new("", "rust", "Empty"),
    );

    assert!(matches!(result, Err(CoreError::Validation { field: "code", .. })));
    assert_eq!(state.projects(), projects);
    assert_eq!(state.usage(), usage);

    match rx.recv().await.unwrap() {
        StateEvent::Notice(notice) => {
            assert_eq!(notice.level, NoticeLevel::Error);
            assert_eq!(notice.message, "Please provide some code to document");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_job_still_commits() {
    let (sessions, state) = session();
    let mut rx = state.event_bus().subscribe();
    let before = state.projects().len();

    let handle = spawn_generation(
        &sessions,
        generator(),
        GenerationRequest::new("fn main() {}", "rust", "Orphan"),
    )
    .unwrap();
    drop(handle);
    // The view goes away entirely
    drop(state);
    sessions.logout();

    let committed = loop {
        match rx.recv().await.unwrap() {
            StateEvent::GenerationCompleted(id) => break id,
            _ => continue,
        }
    };

    let (state, _) = sessions.login(UserId::from("alice"));
    assert_eq!(state.projects().len(), before + 1);
    assert_eq!(state.projects()[0].id, committed);
    assert_eq!(state.usage().projects, before as u64 + 1);
}

#[tokio::test(start_paused = true)]
async fn test_late_commit_lands_in_new_session() {
    let (sessions, state) = session();
    let handle = spawn_generation(
        &sessions,
        generator(),
        GenerationRequest::new("fn main() {}", "rust", "Orphan"),
    )
    .unwrap();
    drop(handle);
    drop(state);
    sessions.logout();

    // Back in before the job finishes; this session owns the snapshots now
    let (state, _) = sessions.login(UserId::from("alice"));
    state.create_project(NewProject::new("CreatedAfterRelogin", "Go"));
    state.increment_usage(UsageIncrement::ApiCalls(10)).unwrap();

    tokio::time::sleep(Duration::from_secs(5)).await;

    let names: Vec<_> = state.projects().into_iter().map(|p| p.name).collect();
    assert_eq!(names[..2], ["Orphan", "CreatedAfterRelogin"]);

    drop(state);
    sessions.logout();
    let (reloaded, _) = sessions.login(UserId::from("alice"));
    let names: Vec<_> = reloaded.projects().into_iter().map(|p| p.name).collect();
    assert_eq!(names.len(), 6);
    assert!(names.contains(&"CreatedAfterRelogin".to_string()));
    assert!(names.contains(&"Orphan".to_string()));

    let usage = reloaded.usage();
    assert_eq!(usage.api_calls, 23 + 10 + 1);
    assert_eq!(usage.projects, 6);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_job_does_not_commit() {
    let (sessions, state) = session();
    let before = (state.projects(), state.usage());

    let mut handle = spawn_generation(
        &sessions,
        generator(),
        GenerationRequest::new("fn main() {}", "rust", "Cancelled"),
    )
    .unwrap();

    assert!(handle.cancel());
    assert!(!handle.cancel());
    assert!(matches!(
        handle.wait().await,
        Err(CoreError::GenerationCancelled)
    ));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!((state.projects(), state.usage()), before);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_jobs_get_distinct_ids() {
    let (sessions, state) = session();
    let generator = generator();

    let handles: Vec<_> = (0..5)
        .map(|i| {
            spawn_generation(
                &sessions,
                generator.clone(),
                GenerationRequest::new("code", "go", format!("svc-{i}")),
            )
            .unwrap()
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.wait().await.unwrap().id.into_inner());
    }
    ids.sort();
    ids.dedup();

    assert_eq!(ids.len(), 5);
    assert_eq!(state.usage().projects, 4 + 5);
}

#[tokio::test]
async fn test_generation_needs_a_session() {
    let sessions = SessionManager::new(Arc::new(MemorySnapshotStore::new()), CoreConfig::default());
    let result = spawn_generation(
        &sessions,
        generator(),
        GenerationRequest::new("fn main() {}", "rust", "Nobody"),
    );
    assert!(matches!(result, Err(CoreError::NoActiveSession)));
}
