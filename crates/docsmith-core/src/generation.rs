//! Document generation jobs
//!
//! The generator itself is an opaque collaborator; [`MockGenerator`] stands
//! in for it with a fixed delay. A job runs on the tokio runtime and, when
//! it finishes, commits a project and its usage charge for the user whose
//! session started it. The commit lands in that user's live session, or in
//! their stored snapshots if they have logged out meanwhile.
//!
//! Dropping a [`GenerationHandle`] does not stop the job: an abandoned view
//! still gets its project. Only [`GenerationHandle::cancel`] prevents the
//! commit.

use crate::error::CoreError;
use crate::event::{Notice, StateEvent};
use crate::models::{format_size, NewProject, Project, ProjectStatus, DEFAULT_SIZE};
use crate::session::SessionManager;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Input for one generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub code: String,
    pub language: String,
    pub project_name: String,
    /// Number of uploaded files (0 when code was pasted)
    pub file_count: u32,
    /// Size of the first uploaded file
    pub source_bytes: Option<u64>,
}

impl GenerationRequest {
    pub fn new(
        code: impl Into<String>,
        language: impl Into<String>,
        project_name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
            project_name: project_name.into(),
            file_count: 0,
            source_bytes: None,
        }
    }

    /// Mark the code as coming from uploaded files
    pub fn with_files(mut self, file_count: u32, first_file_bytes: u64) -> Self {
        self.file_count = file_count;
        self.source_bytes = Some(first_file_bytes);
        self
    }

    /// Reject requests missing required input; nothing is mutated on failure
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.code.trim().is_empty() {
            return Err(CoreError::validation(
                "code",
                "Please provide some code to document",
            ));
        }
        if self.project_name.trim().is_empty() {
            return Err(CoreError::validation(
                "project_name",
                "Please provide a project name",
            ));
        }
        Ok(())
    }

    fn into_project(self, documentation: String) -> NewProject {
        let size = match self.source_bytes {
            Some(bytes) if self.file_count > 0 => format_size(bytes),
            _ => DEFAULT_SIZE.to_string(),
        };

        NewProject::new(self.project_name, self.language)
            .with_status(ProjectStatus::Completed)
            .with_files(self.file_count.max(1), size)
            .with_documentation(documentation)
    }
}

/// Service turning source code into a markdown document
pub trait DocGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;
}

/// Fixed-delay stand-in for the real generation backend
#[derive(Debug, Clone)]
pub struct MockGenerator {
    delay: Duration,
}

impl MockGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl DocGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, CoreError> {
        tokio::time::sleep(self.delay).await;
        Ok(render_markdown(request))
    }
}

/// Template document produced by [`MockGenerator`]
pub fn render_markdown(request: &GenerationRequest) -> String {
    let name = request.project_name.trim();
    let language = request.language.as_str();
    let slug = name.to_lowercase().replace(' ', "-");
    let data_type = if language.eq_ignore_ascii_case("javascript") {
        "Object"
    } else {
        "any"
    };

    format!(
        r#"# {name} Documentation

## Overview
This {language} project provides essential functionality for modern applications.
The codebase keeps a clear separation of concerns, which makes it easy to understand, test, and maintain.

## Functions

### main()
Entry point of the application.

**Returns:** `void`

### processData(data)
Processes the input data and returns formatted results.

**Parameters:**
- `data` ({data_type}) - The input data to process

**Returns:** `{data_type}` - Processed data with validation results

```{language}
const result = processData(inputData);
```

### validateInput(input)
Validates input parameters.

**Returns:** `boolean` - True if valid

## Installation

```bash
git clone https://github.com/yourname/{slug}
```

## Usage

1. Import the necessary functions
2. Initialize the application by calling main()
3. Use processData() for data processing
"#
    )
}

/// Handle on a running generation job
pub struct GenerationHandle {
    project_name: String,
    cancel: Option<oneshot::Sender<()>>,
    done: oneshot::Receiver<Result<Project, CoreError>>,
}

impl GenerationHandle {
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Ask the job to stop before it commits.
    /// Returns false if the job already finished or was already cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Wait for the job and return the committed project
    pub async fn wait(self) -> Result<Project, CoreError> {
        self.done.await.map_err(|_| CoreError::GenerationFailed {
            message: "generation task stopped without reporting".to_string(),
        })?
    }
}

/// Validate `request` and start generating for the active session's user
///
/// Validation failures publish an error notice and return immediately
/// without touching state.
pub fn spawn_generation<G: DocGenerator>(
    sessions: &SessionManager,
    generator: Arc<G>,
    request: GenerationRequest,
) -> Result<GenerationHandle, CoreError> {
    let target = sessions.commit_target()?;
    let bus = sessions.event_bus().clone();

    if let Err(e) = request.validate() {
        debug!(error = %e, "Generation request rejected");
        bus.notify(Notice::error(e.to_string()));
        return Err(e);
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let (done_tx, done_rx) = oneshot::channel();
    let project_name = request.project_name.clone();

    info!(user = %target.user(), project = %project_name, "Generation started");

    tokio::spawn(async move {
        let outcome = tokio::select! {
            result = generator.generate(&request) => result,
            // A dropped handle closes the channel without sending; keep running
            Ok(()) = cancel_rx => Err(CoreError::GenerationCancelled),
        };

        let outcome = match outcome {
            Ok(documentation) => {
                let project = target.commit_generation(request.into_project(documentation));
                bus.publish(StateEvent::GenerationCompleted(project.id.clone()));
                bus.notify(Notice::success("Documentation generated successfully!"));
                Ok(project)
            }
            Err(CoreError::GenerationCancelled) => {
                info!(project = %request.project_name, "Generation cancelled");
                Err(CoreError::GenerationCancelled)
            }
            Err(e) => {
                warn!(project = %request.project_name, error = %e, "Generation failed");
                bus.notify(Notice::error(e.to_string()));
                Err(e)
            }
        };

        // Receiver may be gone if the handle was dropped
        let _ = done_tx.send(outcome);
    });

    Ok(GenerationHandle {
        project_name,
        cancel: Some(cancel_tx),
        done: done_rx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_code_then_name() {
        let err = GenerationRequest::new("  ", "rust", "").validate().unwrap_err();
        assert!(matches!(err, CoreError::Validation { field: "code", .. }));

        let err = GenerationRequest::new("fn main() {}", "rust", " ")
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Please provide a project name");

        assert!(GenerationRequest::new("fn main() {}", "rust", "demo")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_into_project_sizes() {
        let pasted = GenerationRequest::new("x", "python", "Paste").into_project("doc".into());
        assert_eq!(pasted.file_count, 1);
        assert_eq!(pasted.size, "0.5 MB");
        assert_eq!(pasted.documentation.as_deref(), Some("doc"));

        let uploaded = GenerationRequest::new("x", "python", "Upload")
            .with_files(3, 1_572_864)
            .into_project("doc".into());
        assert_eq!(uploaded.file_count, 3);
        assert_eq!(uploaded.size, "1.5 MB");
    }

    #[test]
    fn test_render_markdown() {
        let doc = render_markdown(&GenerationRequest::new("x", "javascript", "My App"));
        assert!(doc.starts_with("# My App Documentation"));
        assert!(doc.contains("(Object)"));
        assert!(doc.contains("github.com/yourname/my-app"));

        let doc = render_markdown(&GenerationRequest::new("x", "python", "tool"));
        assert!(doc.contains("(any)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_generator_waits_for_delay() {
        let generator = MockGenerator::new(Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        let doc = generator
            .generate(&GenerationRequest::new("x", "go", "svc"))
            .await
            .unwrap();

        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(doc.contains("# svc Documentation"));
    }
}
