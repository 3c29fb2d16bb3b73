//! Plain text rendering of tool results

use gitmcp_auth::{Identity, Permission, RolePermissionRegistry};
use gitmcp_repo::{
    engagement_level, engagement_score, Issue, PriorityLevel, PriorityReport, PullRequest,
};
use std::fmt::Write;

const READ_TOOLS: &[(&str, &str)] = &[
    ("list_prs", "List pull requests"),
    ("list_issues", "List repository issues"),
    ("search_issues", "Search issues by keyword"),
    ("get_pending_reviews", "Get PRs pending review"),
    ("analyze_issue_priority", "Analyze issue priority"),
    ("get_my_permissions", "Show your access details"),
];
const WRITE_TOOLS: &[(&str, &str)] = &[("create_issue", "Create new issues")];

pub(crate) fn issue_list(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return "No open issues found.".to_string();
    }

    let mut output = String::new();
    for issue in issues {
        let _ = writeln!(output, "- #{}: {}", issue.number, issue.title);
    }
    output
}

pub(crate) fn pull_request_list(pulls: &[PullRequest]) -> String {
    if pulls.is_empty() {
        return "No open pull requests found.".to_string();
    }

    let mut output = String::new();
    for pull in pulls {
        let _ = writeln!(output, "- #{}: {}", pull.number, pull.title);
    }
    output
}

/// Search results, optionally grouped by engagement
///
/// `issues` must already be ranked when `prioritize` is set.
pub(crate) fn search_results(query: &str, issues: &[Issue], prioritize: bool) -> String {
    if issues.is_empty() {
        return "No issues found matching the search criteria.".to_string();
    }

    let mut output = format!("Found {} issues related to '{}':\n\n", issues.len(), query);

    if !prioritize {
        for issue in issues {
            let _ = writeln!(output, "- #{}: {}", issue.number, issue.title);
        }
        return output;
    }

    let levels = [PriorityLevel::High, PriorityLevel::Medium, PriorityLevel::Low];
    let sections: Vec<String> = levels
        .iter()
        .filter_map(|level| {
            let lines: Vec<String> = issues
                .iter()
                .filter(|issue| engagement_level(engagement_score(issue)) == *level)
                .map(engagement_line)
                .collect();
            if lines.is_empty() {
                return None;
            }
            Some(format!(
                "{} PRIORITY:\n{}\n",
                level.as_str().to_uppercase(),
                lines.join("\n")
            ))
        })
        .collect();

    output.push_str(&sections.join("\n"));
    output
}

fn engagement_line(issue: &Issue) -> String {
    let labels: String = issue
        .labels
        .iter()
        .map(|label| format!("[{}] ", label.name))
        .collect();

    format!(
        "- #{}: {} {}(Score: {} - {} comments, {} reactions)",
        issue.number,
        issue.title,
        labels,
        engagement_score(issue),
        issue.comments,
        issue.reaction_count()
    )
}

pub(crate) fn pending_reviews(pulls: &[PullRequest]) -> String {
    if pulls.is_empty() {
        return "No pull requests pending review found.".to_string();
    }

    let mut output = format!("Found {} PRs pending review:\n\n", pulls.len());
    for pull in pulls {
        let _ = write!(output, "- #{}: {}", pull.number, pull.title);
        if let Some(created_at) = pull.created_at {
            let _ = write!(output, " (opened {})", created_at.format("%Y-%m-%d"));
        }
        output.push('\n');
        if pull.draft {
            output.push_str("  DRAFT PR\n");
        }
    }
    output
}

pub(crate) fn created_issue(issue: &Issue) -> String {
    format!(
        "Issue created successfully!\n\n- Number: #{}\n- Title: {}\n- URL: {}\n- State: {}",
        issue.number, issue.title, issue.html_url, issue.state
    )
}

pub(crate) fn priority_report(report: &PriorityReport) -> String {
    if report.is_empty() {
        return "No issues found for priority analysis.".to_string();
    }

    let mut output = String::from("ISSUE PRIORITY ANALYSIS\n\n");
    for level in PriorityLevel::ALL {
        let bucket = report.bucket(level);
        let _ = writeln!(
            output,
            "{} ({} issues):",
            level.as_str().to_uppercase(),
            bucket.len()
        );
        for issue in bucket {
            let _ = writeln!(
                output,
                "- #{}: {} (Score: {})",
                issue.number, issue.title, issue.priority_score
            );
        }
        output.push('\n');
    }
    output
}

/// Roles, granted permissions and the tools they unlock
pub(crate) fn access_details(identity: &Identity, registry: &RolePermissionRegistry) -> String {
    let mut output = String::from("Your Access Details:\n\nRoles:\n");
    for role in &identity.roles {
        let _ = writeln!(output, "- {}", role);
    }

    output.push_str("\nPermissions:\n");
    for permission in registry.permissions_for(&identity.roles) {
        let _ = writeln!(output, "- {}", permission);
    }

    output.push_str("\nAvailable Tools:\n");
    let groups = [(Permission::ReadTools, READ_TOOLS), (Permission::WriteTools, WRITE_TOOLS)];
    for (permission, tools) in groups {
        if !registry.has_permission(&identity.roles, permission) {
            continue;
        }
        for (name, summary) in tools {
            let _ = writeln!(output, "- {} ({})", name, summary);
        }
    }
    output
}
