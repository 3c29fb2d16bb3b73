//! Issue tracker data model
//!
//! Field names follow the GitHub REST payloads so responses deserialize
//! directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account that authored an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

/// Reaction summary attached to an issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    #[serde(default)]
    pub total_count: u64,
}

/// Issue as returned by the issue and search endpoints
///
/// Pull requests also come back from the issue endpoints; those carry a
/// `pull_request` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub reactions: Option<Reactions>,
    #[serde(default)]
    pub labels: Vec<Label>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    /// Total reactions, zero when the payload had none
    pub fn reaction_count(&self) -> u64 {
        self.reactions.as_ref().map_or(0, |r| r.total_count)
    }

    /// Whether any label equals one of `names`, ignoring case
    pub fn has_any_label(&self, names: &[&str]) -> bool {
        self.labels
            .iter()
            .any(|label| names.iter().any(|name| label.name.eq_ignore_ascii_case(name)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<User>,
}

/// Pull request review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub state: String,
    #[serde(default)]
    pub user: Option<User>,
}

impl Review {
    pub fn is_approval(&self) -> bool {
        self.state == "APPROVED"
    }
}

/// Payload for creating an issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

/// State filter for listings and searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    #[default]
    Open,
    Closed,
    All,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Open => "open",
            ItemState::Closed => "closed",
            ItemState::All => "all",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "open" => Ok(ItemState::Open),
            "closed" => Ok(ItemState::Closed),
            "all" => Ok(ItemState::All),
            _ => Err(format!("Unknown state '{}', expected open, closed or all", s)),
        }
    }
}
