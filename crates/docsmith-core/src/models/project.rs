//! Project records produced by documentation generation

use crate::error::CoreError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Size shown for generations that were not backed by an uploaded file
pub const DEFAULT_SIZE: &str = "0.5 MB";

/// Newtype for Project ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random ID (UUID v4), distinct even for creations in the same instant
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for ProjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ProjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProjectId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProjectId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lifecycle state of a project's documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Completed,
    Processing,
    Failed,
}

impl ProjectStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Completed => "completed",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completed" => Ok(Self::Completed),
            "processing" => Ok(Self::Processing),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::UnknownStatus {
                name: s.to_string(),
            }),
        }
    }
}

/// A generated-documentation project owned by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Language tag as chosen by the user (e.g. "Python", "javascript")
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub status: ProjectStatus,
    pub file_count: u32,
    /// Human-readable size descriptor (e.g. "2.4 MB")
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

/// Caller-supplied fields for a new project
///
/// `id` and `created_at` are assigned by the registry.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub language: String,
    pub status: ProjectStatus,
    pub file_count: u32,
    pub size: String,
    pub documentation: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
            status: ProjectStatus::Completed,
            file_count: 1,
            size: DEFAULT_SIZE.to_string(),
            documentation: None,
        }
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_files(mut self, file_count: u32, size: impl Into<String>) -> Self {
        self.file_count = file_count;
        self.size = size.into();
        self
    }

    pub fn with_documentation(mut self, documentation: impl Into<String>) -> Self {
        self.documentation = Some(documentation.into());
        self
    }

    pub(crate) fn into_project(self, id: ProjectId, now: DateTime<Utc>) -> Project {
        Project {
            id,
            name: self.name,
            language: self.language,
            created_at: now,
            last_modified: now,
            status: self.status,
            file_count: self.file_count,
            size: self.size,
            documentation: self.documentation,
        }
    }
}

/// Partial update merged into an existing project
///
/// Identity and creation time are deliberately absent: they never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub language: Option<String>,
    pub status: Option<ProjectStatus>,
    pub file_count: Option<u32>,
    pub size: Option<String>,
    pub documentation: Option<String>,
}

impl ProjectPatch {
    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge into `project` and stamp `last_modified`
    pub(crate) fn apply(self, project: &mut Project, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            project.name = name;
        }
        if let Some(language) = self.language {
            project.language = language;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
        if let Some(file_count) = self.file_count {
            project.file_count = file_count;
        }
        if let Some(size) = self.size {
            project.size = size;
        }
        if let Some(documentation) = self.documentation {
            project.documentation = Some(documentation);
        }
        project.last_modified = now;
    }
}

/// Format a byte count the way the dashboard displays sizes
pub fn format_size(bytes: u64) -> String {
    format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
}

/// Demo projects shown to a user on first login
pub fn demo_projects(now: DateTime<Utc>) -> Vec<Project> {
    let demo = [
        ("1", "E-commerce API", "Python", 2, 12, "2.4 MB"),
        ("2", "React Dashboard", "JavaScript", 5, 8, "1.8 MB"),
        ("3", "User Auth Service", "Node.js", 24, 6, "1.2 MB"),
        ("4", "Data Pipeline", "Python", 48, 15, "3.1 MB"),
    ];

    demo.into_iter()
        .map(|(id, name, language, hours_ago, file_count, size)| {
            let at = now - Duration::hours(hours_ago);
            Project {
                id: ProjectId::from(id),
                name: name.to_string(),
                language: language.to_string(),
                created_at: at,
                last_modified: at,
                status: ProjectStatus::Completed,
                file_count,
                size: size.to_string(),
                documentation: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_serializes_camel_case() {
        let now = Utc::now();
        let project = NewProject::new("API", "Python").into_project(ProjectId::from("7"), now);

        let json = serde_json::to_value(&project).unwrap();
        assert_eq!(json["id"], "7");
        assert_eq!(json["status"], "completed");
        assert_eq!(json["fileCount"], 1);
        assert!(json.get("createdAt").is_some());
        assert!(json.get("documentation").is_none());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "Failed".parse::<ProjectStatus>().unwrap(),
            ProjectStatus::Failed
        );
        assert_eq!(
            "processing".parse::<ProjectStatus>().unwrap(),
            ProjectStatus::Processing
        );
        assert!("archived".parse::<ProjectStatus>().is_err());
        assert!("done".parse::<ProjectStatus>().is_err());
        assert!("in-progress".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn test_patch_keeps_created_at() {
        let created = Utc::now() - Duration::hours(3);
        let mut project =
            NewProject::new("API", "Python").into_project(ProjectId::from("1"), created);

        let later = Utc::now();
        ProjectPatch::status(ProjectStatus::Failed).apply(&mut project, later);

        assert_eq!(project.status, ProjectStatus::Failed);
        assert_eq!(project.created_at, created);
        assert_eq!(project.last_modified, later);
        assert_eq!(project.name, "API");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(2_516_582), "2.4 MB");
        assert_eq!(format_size(0), "0.0 MB");
    }

    #[test]
    fn test_demo_projects_newest_first() {
        let now = Utc::now();
        let demo = demo_projects(now);
        assert_eq!(demo.len(), 4);
        assert_eq!(demo[0].name, "E-commerce API");
        assert!(demo
            .windows(2)
            .all(|pair| pair[0].created_at > pair[1].created_at));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = ProjectId::generate();
        let b = ProjectId::generate();
        assert_ne!(a, b);
    }
}
