//! Tool names, descriptions and input schemas as advertised by `tools/list`

use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Builder for an object schema with typed, described properties
struct SchemaBuilder {
    properties: Map<String, Value>,
    required: Vec<&'static str>,
}

impl SchemaBuilder {
    fn new() -> Self {
        Self {
            properties: Map::new(),
            required: Vec::new(),
        }
    }

    fn property(mut self, name: &'static str, kind: &str, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            json!({ "type": kind, "description": description }),
        );
        self
    }

    fn required(mut self, name: &'static str, kind: &str, description: &str) -> Self {
        self.required.push(name);
        self.property(name, kind, description)
    }

    /// `owner` and `repo`, both required
    fn repository(self) -> Self {
        self.required("owner", "string", "GitHub org or user")
            .required("repo", "string", "GitHub repository name")
    }

    fn build(self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

fn definition(
    name: &'static str,
    description: &'static str,
    schema: SchemaBuilder,
) -> ToolDefinition {
    ToolDefinition {
        name,
        description,
        input_schema: schema.build(),
    }
}

pub(crate) fn list_prs() -> ToolDefinition {
    definition(
        "list_prs",
        "List pull requests in a GitHub repository",
        SchemaBuilder::new().repository().property(
            "state",
            "string",
            "State of PRs to list (open, closed, all). Defaults to open",
        ),
    )
}

pub(crate) fn list_issues() -> ToolDefinition {
    definition(
        "list_issues",
        "List issues in a GitHub repository",
        SchemaBuilder::new().repository().property(
            "state",
            "string",
            "State of issues to list (open, closed, all). Defaults to open",
        ),
    )
}

pub(crate) fn search_issues() -> ToolDefinition {
    definition(
        "search_issues",
        "Search issues by keyword/topic and analyze priority",
        SchemaBuilder::new()
            .repository()
            .required("query", "string", "Search query/topic to filter issues")
            .property(
                "state",
                "string",
                "State of issues to search (open, closed, all). Defaults to open",
            )
            .property(
                "prioritize",
                "boolean",
                "Whether to analyze and sort by priority. Defaults to false",
            ),
    )
}

pub(crate) fn get_pending_reviews() -> ToolDefinition {
    definition(
        "get_pending_reviews",
        "Get pull requests pending review",
        SchemaBuilder::new().repository(),
    )
}

pub(crate) fn create_issue() -> ToolDefinition {
    definition(
        "create_issue",
        "Create a new GitHub issue",
        SchemaBuilder::new()
            .repository()
            .required("title", "string", "Issue title")
            .property("body", "string", "Issue body/description")
            .property("labels", "string", "Comma-separated labels to apply to the issue")
            .property("assignee", "string", "Username to assign the issue to"),
    )
}

pub(crate) fn analyze_issue_priority() -> ToolDefinition {
    definition(
        "analyze_issue_priority",
        "Analyze and rank issues by priority based on comments, reactions, labels",
        SchemaBuilder::new().repository().property(
            "limit",
            "number",
            "Maximum number of issues to analyze. Defaults to 20",
        ),
    )
}

pub(crate) fn get_my_permissions() -> ToolDefinition {
    definition(
        "get_my_permissions",
        "Get current user's roles and permissions",
        SchemaBuilder::new(),
    )
}
