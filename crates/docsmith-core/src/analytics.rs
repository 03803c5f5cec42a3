//! Dashboard figures derived from projects and usage

use crate::models::{Project, UsageStats};
use chrono::{DateTime, Utc};

/// Hours of manual writing one generated document is credited with
const HOURS_SAVED_PER_DOCUMENT: f64 = 2.5;

/// Headline numbers for the dashboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub documents_generated: u64,
    pub projects: u64,
    pub time_saved_hours: u64,
    pub api_requests: u64,
}

impl DashboardSummary {
    pub fn from_usage(usage: &UsageStats) -> Self {
        Self {
            documents_generated: usage.documents_generated,
            projects: usage.projects,
            time_saved_hours: (usage.documents_generated as f64 * HOURS_SAVED_PER_DOCUMENT).floor()
                as u64,
            api_requests: usage.api_calls,
        }
    }
}

/// Project count for one language
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageShare {
    pub language: String,
    pub count: usize,
    pub percent: f64,
}

/// Projects per language, in first-seen order
pub fn language_breakdown(projects: &[Project]) -> Vec<LanguageShare> {
    let mut shares: Vec<LanguageShare> = Vec::new();
    for project in projects {
        match shares.iter_mut().find(|s| s.language == project.language) {
            Some(share) => share.count += 1,
            None => shares.push(LanguageShare {
                language: project.language.clone(),
                count: 1,
                percent: 0.0,
            }),
        }
    }

    let total = projects.len() as f64;
    for share in &mut shares {
        share.percent = share.count as f64 / total * 100.0;
    }
    shares
}

/// The newest `limit` projects
pub fn recent_projects(projects: &[Project], limit: usize) -> &[Project] {
    &projects[..projects.len().min(limit)]
}

/// "Just now", "5 hours ago", "1 day ago", "3 days ago"
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let hours = (now - timestamp).num_hours();
    if hours < 1 {
        "Just now".to_string()
    } else if hours < 24 {
        format!("{} hours ago", hours)
    } else if hours < 48 {
        "1 day ago".to_string()
    } else {
        format!("{} days ago", hours / 24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::demo_projects;
    use chrono::Duration;

    #[test]
    fn test_summary_time_saved() {
        let summary = DashboardSummary::from_usage(&UsageStats::default());
        assert_eq!(summary.documents_generated, 12);
        assert_eq!(summary.time_saved_hours, 30);

        let mut usage = UsageStats::default();
        usage.documents_generated = 13;
        assert_eq!(DashboardSummary::from_usage(&usage).time_saved_hours, 32);
    }

    #[test]
    fn test_language_breakdown() {
        let shares = language_breakdown(&demo_projects(Utc::now()));
        assert_eq!(shares.len(), 3);
        assert_eq!(shares[0].language, "Python");
        assert_eq!(shares[0].count, 2);
        assert_eq!(shares[0].percent, 50.0);
        assert!(language_breakdown(&[]).is_empty());
    }

    #[test]
    fn test_recent_projects() {
        let projects = demo_projects(Utc::now());
        assert_eq!(recent_projects(&projects, 2).len(), 2);
        assert_eq!(recent_projects(&projects, 10).len(), 4);
    }

    #[test]
    fn test_format_relative() {
        let now = Utc::now();
        assert_eq!(format_relative(now - Duration::minutes(30), now), "Just now");
        assert_eq!(format_relative(now - Duration::hours(5), now), "5 hours ago");
        assert_eq!(format_relative(now - Duration::hours(30), now), "1 day ago");
        assert_eq!(format_relative(now - Duration::hours(72), now), "3 days ago");
    }
}
