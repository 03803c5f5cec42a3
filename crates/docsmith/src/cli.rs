//! CLI commands over a user's AppState
//!
//! Each command runs one operation against the state and renders the result
//! as a table, or as JSON with `--json`.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use docsmith_core::analytics::{format_relative, language_breakdown, recent_projects};
use docsmith_core::models::{Plan, Project, ProjectPatch, ProjectStatus, UsageIncrement};
use docsmith_core::quota::{AlertLevel, ResourceQuota};
use docsmith_core::{
    spawn_generation, AppState, GenerationRequest, MockGenerator, ProjectQuery, SessionManager,
};
use std::path::PathBuf;
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    table
}

fn status_cell(status: ProjectStatus) -> Cell {
    let color = match status {
        ProjectStatus::Completed => Color::Green,
        ProjectStatus::Processing => Color::Yellow,
        ProjectStatus::Failed => Color::Red,
    };
    Cell::new(status).fg(color)
}

fn alert_color(level: AlertLevel) -> Color {
    match level {
        AlertLevel::Safe => Color::Green,
        AlertLevel::Warning => Color::Yellow,
        AlertLevel::Critical => Color::Red,
        AlertLevel::Exceeded => Color::Magenta,
    }
}

fn quota_row(name: &str, quota: &ResourceQuota, unit: &str) -> Vec<Cell> {
    vec![
        Cell::new(name),
        Cell::new(format!("{:.1}{unit} / {:.1}{unit}", quota.used, quota.limit)),
        Cell::new(format!("{:.1}%", quota.usage_pct)).fg(alert_color(quota.alert_level)),
        Cell::new(quota.alert_level.as_str()),
    ]
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

/// Map a file extension to the language tag used by the generator
pub fn language_for_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "js" => "javascript",
        "ts" => "typescript",
        "py" => "python",
        "java" => "java",
        "cpp" | "cc" | "hpp" => "cpp",
        "c" | "h" => "c",
        "php" => "php",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        _ => "javascript",
    }
}

// ============================================================================
// Commands
// ============================================================================

pub fn run_dashboard(state: &AppState, json: bool) -> Result<()> {
    let summary = state.summary();
    let quota = state.quota();
    let plan = state.plan();
    let projects = state.projects();

    if json {
        return print_json(&serde_json::json!({
            "user": state.user().as_str(),
            "plan": plan,
            "usage": state.usage(),
            "timeSavedHours": summary.time_saved_hours,
            "apiCallsPct": quota.api_calls.usage_pct,
            "storagePct": quota.storage.usage_pct,
            "recentProjects": recent_projects(&projects, 4),
        }));
    }

    println!(
        "{} plan (${}/month) for {}",
        plan.display_name(),
        plan.monthly_price_usd(),
        state.user()
    );

    let mut headline = new_table(&["Documents", "Projects", "Time saved", "API requests"]);
    headline.add_row(vec![
        summary.documents_generated.to_string(),
        summary.projects.to_string(),
        format!("{}h", summary.time_saved_hours),
        summary.api_requests.to_string(),
    ]);
    println!("{headline}");

    let mut usage = new_table(&["Resource", "Used", "Usage", "Level"]);
    usage.add_row(quota_row("API calls", &quota.api_calls, ""));
    usage.add_row(quota_row("Storage", &quota.storage, " GB"));
    println!("{usage}");

    if quota.worst() == AlertLevel::Exceeded && plan != Plan::Enterprise {
        println!("Over quota: run `docsmith upgrade pro` for higher limits");
    }

    let now = Utc::now();
    let mut recent = new_table(&["Recent project", "Language", "Updated"]);
    for project in recent_projects(&projects, 4) {
        recent.add_row(vec![
            project.name.clone(),
            project.language.clone(),
            format_relative(project.last_modified, now),
        ]);
    }
    println!("{recent}");

    let shares = language_breakdown(&projects);
    if !shares.is_empty() {
        let mut languages = new_table(&["Language", "Projects", "Share"]);
        for share in shares {
            languages.add_row(vec![
                share.language,
                share.count.to_string(),
                format!("{:.0}%", share.percent),
            ]);
        }
        println!("{languages}");
    }

    Ok(())
}

pub fn run_projects(
    state: &AppState,
    search: Option<String>,
    language: Option<String>,
    json: bool,
) -> Result<()> {
    let mut query = ProjectQuery::new();
    if let Some(search) = search {
        query = query.name_contains(search);
    }
    if let Some(language) = language.filter(|l| l != "all") {
        query = query.language(language);
    }

    let projects = state.find_projects(&query);
    if json {
        return print_json(&projects);
    }

    if projects.is_empty() {
        println!(
            "No projects match (languages: {})",
            state.languages().join(", ")
        );
        return Ok(());
    }

    let now = Utc::now();
    let mut table = new_table(&["ID", "Name", "Language", "Status", "Files", "Size", "Created"]);
    for project in &projects {
        table.add_row(vec![
            Cell::new(&project.id),
            Cell::new(&project.name),
            Cell::new(&project.language),
            status_cell(project.status),
            Cell::new(project.file_count),
            Cell::new(&project.size),
            Cell::new(format_relative(project.created_at, now)),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn run_show(state: &AppState, id: &str, json: bool) -> Result<()> {
    let Some(project) = state.project(id) else {
        bail!("No project with id '{}'", id);
    };

    if json {
        return print_json(&project);
    }

    print_project(&project);
    Ok(())
}

fn print_project(project: &Project) {
    let mut table = new_table(&["Field", "Value"]);
    table.add_row(vec![Cell::new("ID"), Cell::new(&project.id)]);
    table.add_row(vec![Cell::new("Name"), Cell::new(&project.name)]);
    table.add_row(vec![Cell::new("Language"), Cell::new(&project.language)]);
    table.add_row(vec![Cell::new("Status"), status_cell(project.status)]);
    table.add_row(vec![Cell::new("Files"), Cell::new(project.file_count)]);
    table.add_row(vec![Cell::new("Size"), Cell::new(&project.size)]);
    table.add_row(vec![
        Cell::new("Created"),
        Cell::new(project.created_at.to_rfc3339()),
    ]);
    table.add_row(vec![
        Cell::new("Modified"),
        Cell::new(project.last_modified.to_rfc3339()),
    ]);
    println!("{table}");

    if let Some(doc) = &project.documentation {
        println!("\n{doc}");
    }
}

pub async fn run_generate(
    sessions: &SessionManager,
    file: PathBuf,
    name: Option<String>,
    language: Option<String>,
    json: bool,
) -> Result<()> {
    let code = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let bytes = std::fs::metadata(&file)
        .with_context(|| format!("Failed to stat {}", file.display()))?
        .len();

    let name = name.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let language = language.unwrap_or_else(|| {
        let ext = file
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        language_for_extension(&ext).to_string()
    });

    let request = GenerationRequest::new(code, language, name).with_files(1, bytes);
    let generator = Arc::new(MockGenerator::new(sessions.config().generation_delay()));

    let handle = spawn_generation(sessions, generator, request)?;
    eprintln!("Generating documentation for {}...", handle.project_name());
    let project = handle.wait().await?;

    if json {
        return print_json(&project);
    }

    println!("Documentation generated: {} ({})", project.name, project.id);
    print_project(&project);
    Ok(())
}

pub fn run_update(
    state: &AppState,
    id: &str,
    name: Option<String>,
    status: Option<String>,
) -> Result<()> {
    let patch = ProjectPatch {
        name,
        status: status.map(|s| s.parse::<ProjectStatus>()).transpose()?,
        ..Default::default()
    };
    if patch.is_empty() {
        bail!("Nothing to update: pass --name and/or --status");
    }

    if state.update_project(id, patch) {
        println!("Project {} updated", id);
    } else {
        println!("No project with id '{}', nothing changed", id);
    }
    Ok(())
}

pub fn run_delete(state: &AppState, id: &str) -> Result<()> {
    if state.delete_project(id) {
        println!("Project deleted successfully");
    } else {
        println!("No project with id '{}', nothing changed", id);
    }
    Ok(())
}

pub fn run_upgrade(state: &AppState, plan: &str) -> Result<()> {
    let target: Plan = plan.parse()?;
    let transition = state.upgrade_plan(target);
    let limits = target.limits();

    let verb = if transition.is_upgrade() {
        "upgraded"
    } else {
        "switched"
    };
    println!(
        "Successfully {} from {} to {} plan ({} API calls, {} GB)",
        verb,
        transition.from.display_name(),
        transition.to.display_name(),
        limits.max_api_calls,
        limits.max_storage
    );

    let usage = state.usage();
    if usage.is_over_quota() {
        println!(
            "Current usage exceeds the new limits ({} API calls, {:.1} GB)",
            usage.api_calls, usage.storage
        );
    }
    Ok(())
}

pub fn run_meter(state: &AppState, api_calls: Option<u64>, storage: Option<f64>) -> Result<()> {
    if api_calls.is_none() && storage.is_none() {
        bail!("Nothing to record: pass --api-calls and/or --storage");
    }
    if let Some(calls) = api_calls {
        state.increment_usage(UsageIncrement::ApiCalls(calls))?;
    }
    if let Some(gb) = storage {
        state.increment_usage(UsageIncrement::Storage(gb))?;
    }

    let usage = state.usage();
    println!(
        "API calls {}/{}, storage {:.1}/{:.1} GB",
        usage.api_calls, usage.max_api_calls, usage.storage, usage.max_storage
    );
    Ok(())
}
