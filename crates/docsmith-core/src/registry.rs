//! Project registry: ordered CRUD over a user's projects
//!
//! Projects are kept newest-first. The registry only owns the records;
//! keeping the usage counter in step is the job of [`crate::AppState`].

use crate::models::{NewProject, Project, ProjectId, ProjectPatch};
use chrono::{DateTime, Utc};

/// Search criteria for [`ProjectRegistry::find`]
///
/// Unset criteria match everything.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    /// Case-insensitive substring of the project name
    name_contains: Option<String>,
    /// Exact language tag
    language: Option<String>,
}

impl ProjectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name_contains(mut self, needle: impl AsRef<str>) -> Self {
        let needle = needle.as_ref().trim();
        self.name_contains = (!needle.is_empty()).then(|| needle.to_lowercase());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn matches(&self, project: &Project) -> bool {
        let name_ok = self
            .name_contains
            .as_deref()
            .is_none_or(|needle| project.name.to_lowercase().contains(needle));
        let language_ok = self
            .language
            .as_deref()
            .is_none_or(|lang| project.language == lang);
        name_ok && language_ok
    }
}

/// Ordered collection of project records, newest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRegistry {
    projects: Vec<Project>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap records restored from a snapshot (order preserved)
    pub fn from_projects(projects: Vec<Project>) -> Self {
        Self { projects }
    }

    /// Insert a new record at the front and return it
    pub fn create(&mut self, data: NewProject, now: DateTime<Utc>) -> Project {
        let mut id = ProjectId::generate();
        while self.get(id.as_str()).is_some() {
            id = ProjectId::generate();
        }

        let project = data.into_project(id, now);
        self.projects.insert(0, project.clone());
        project
    }

    /// Merge `patch` into the matching record; false if no record matched
    pub fn update(&mut self, id: &str, patch: ProjectPatch, now: DateTime<Utc>) -> bool {
        match self.projects.iter_mut().find(|p| p.id == id) {
            Some(project) => {
                patch.apply(project, now);
                true
            }
            None => false,
        }
    }

    /// Remove the matching record, returning it if it existed
    pub fn delete(&mut self, id: &str) -> Option<Project> {
        let index = self.projects.iter().position(|p| p.id == id)?;
        Some(self.projects.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Matching records in registry order; the iterator can be cloned to restart
    pub fn find<'a>(
        &'a self,
        query: &'a ProjectQuery,
    ) -> impl Iterator<Item = &'a Project> + Clone + 'a {
        self.projects.iter().filter(move |p| query.matches(p))
    }

    pub fn as_slice(&self) -> &[Project] {
        &self.projects
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Distinct language tags in first-seen order
    pub fn languages(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for project in &self.projects {
            if !seen.iter().any(|l| *l == project.language) {
                seen.push(project.language.clone());
            }
        }
        seen
    }
}
