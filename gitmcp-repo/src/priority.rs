//! Issue priority heuristics
//!
//! Scores weigh discussion, reactions, age, priority labels and a few alarm
//! keywords. Scoring takes `now` explicitly so results are reproducible.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::Issue;

const CRITICAL_LABELS: &[&str] = &["critical", "urgent", "p0"];
const HIGH_LABELS: &[&str] = &["high", "important", "p1"];
const MEDIUM_LABELS: &[&str] = &["medium", "p2"];
const LOW_LABELS: &[&str] = &["low", "p3"];
const ALARM_KEYWORDS: &[&str] = &["crash", "security", "blocker"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Critical,
    High,
    Medium,
    Low,
}

impl PriorityLevel {
    pub const ALL: [PriorityLevel; 4] = [
        PriorityLevel::Critical,
        PriorityLevel::High,
        PriorityLevel::Medium,
        PriorityLevel::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Critical => "critical",
            PriorityLevel::High => "high",
            PriorityLevel::Medium => "medium",
            PriorityLevel::Low => "low",
        }
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue summary with its computed score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredIssue {
    pub number: u64,
    pub title: String,
    pub priority_score: u64,
    pub comments: u64,
    pub reactions: u64,
    pub url: String,
}

/// Issues grouped by priority, each group sorted by descending score
#[derive(Debug, Clone, Default, Serialize)]
pub struct PriorityReport {
    pub critical: Vec<ScoredIssue>,
    pub high: Vec<ScoredIssue>,
    pub medium: Vec<ScoredIssue>,
    pub low: Vec<ScoredIssue>,
}

impl PriorityReport {
    pub fn bucket(&self, level: PriorityLevel) -> &[ScoredIssue] {
        match level {
            PriorityLevel::Critical => &self.critical,
            PriorityLevel::High => &self.high,
            PriorityLevel::Medium => &self.medium,
            PriorityLevel::Low => &self.low,
        }
    }

    fn bucket_mut(&mut self, level: PriorityLevel) -> &mut Vec<ScoredIssue> {
        match level {
            PriorityLevel::Critical => &mut self.critical,
            PriorityLevel::High => &mut self.high,
            PriorityLevel::Medium => &mut self.medium,
            PriorityLevel::Low => &mut self.low,
        }
    }

    pub fn total(&self) -> usize {
        PriorityLevel::ALL
            .iter()
            .map(|level| self.bucket(*level).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Compute the priority score of an issue as of `now`
pub fn priority_score(issue: &Issue, now: DateTime<Utc>) -> u64 {
    let mut score = issue.comments * 2 + issue.reaction_count();

    let age_days = (now - issue.created_at).num_days();
    score += match age_days {
        d if d > 30 => 5,
        d if d > 14 => 3,
        d if d > 7 => 1,
        _ => 0,
    };

    score += if issue.has_any_label(CRITICAL_LABELS) {
        10
    } else if issue.has_any_label(HIGH_LABELS) {
        5
    } else if issue.has_any_label(MEDIUM_LABELS) {
        3
    } else if issue.has_any_label(LOW_LABELS) {
        1
    } else {
        0
    };

    let title = issue.title.to_lowercase();
    let body = issue.body.as_deref().unwrap_or_default().to_lowercase();
    for keyword in ALARM_KEYWORDS {
        if title.contains(keyword) || body.contains(keyword) {
            score += 5;
        }
    }

    score
}

/// Bucket for a scored issue; priority labels promote regardless of score
pub fn classify(issue: &Issue, score: u64) -> PriorityLevel {
    if score >= 20 || issue.has_any_label(CRITICAL_LABELS) {
        PriorityLevel::Critical
    } else if score >= 10 || issue.has_any_label(HIGH_LABELS) {
        PriorityLevel::High
    } else if score >= 5 || issue.has_any_label(MEDIUM_LABELS) {
        PriorityLevel::Medium
    } else {
        PriorityLevel::Low
    }
}

/// Score, sort and bucket a batch of issues
pub fn analyze(issues: &[Issue], now: DateTime<Utc>) -> PriorityReport {
    let mut scored: Vec<(u64, &Issue)> = issues
        .iter()
        .map(|issue| (priority_score(issue, now), issue))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));

    let mut report = PriorityReport::default();
    for (score, issue) in scored {
        report.bucket_mut(classify(issue, score)).push(ScoredIssue {
            number: issue.number,
            title: issue.title.clone(),
            priority_score: score,
            comments: issue.comments,
            reactions: issue.reaction_count(),
            url: issue.html_url.clone(),
        });
    }

    report
}

/// Engagement used to rank search results: comments plus reactions
pub fn engagement_score(issue: &Issue) -> u64 {
    issue.comments + issue.reaction_count()
}

/// Search results only distinguish three levels
pub fn engagement_level(score: u64) -> PriorityLevel {
    match score {
        s if s >= 10 => PriorityLevel::High,
        s if s >= 3 => PriorityLevel::Medium,
        _ => PriorityLevel::Low,
    }
}
