//! Tool registry
//!
//! Every tool is registered through [`Dispatcher::protect`], so no handler is
//! reachable without passing authentication and its permission check.

mod format;
mod handlers;
mod schema;

pub use handlers::{
    AnalyzePriorityTool, CreateIssueTool, ListIssuesTool, ListPullRequestsTool, MyPermissionsTool,
    PendingReviewsTool, SearchIssuesTool,
};
pub use schema::ToolDefinition;

use gitmcp_auth::{
    Dispatcher, InvocationError, Permission, ProtectedTool, ToolError, ToolHandler, ToolOutput,
    ToolRequest,
};
use gitmcp_repo::IssueTracker;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// One block of tool output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Result payload of `tools/call`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallToolResult {
    pub content: Vec<TextContent>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    pub fn success(output: ToolOutput) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: output.text,
            }],
            is_error: false,
            structured_content: output.structured,
        }
    }

    /// Error result carrying a stable `{error, reason}` pair
    pub fn error(text: impl Into<String>, error: &str, reason: &str) -> Self {
        Self {
            content: vec![TextContent {
                kind: "text",
                text: text.into(),
            }],
            is_error: true,
            structured_content: Some(json!({ "error": error, "reason": reason })),
        }
    }

    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<InvocationError> for CallToolResult {
    fn from(error: InvocationError) -> Self {
        match &error {
            InvocationError::Rejected(gate) => {
                CallToolResult::error(gate.to_string(), gate.error_code(), gate.reason())
            }
            InvocationError::Handler(ToolError::InvalidArguments(message)) => {
                CallToolResult::error(message.clone(), "tool_error", "invalid_arguments")
            }
            InvocationError::Handler(ToolError::Upstream(e)) => {
                CallToolResult::error(e.to_string(), "tool_error", "upstream")
            }
        }
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    tool: ProtectedTool,
}

/// The protected tools offered by this server, in listing order
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    /// Register the GitHub tools against `tracker`
    pub fn new(dispatcher: &Dispatcher, tracker: Arc<dyn IssueTracker>) -> Self {
        let mut registry = Self { tools: Vec::new() };

        registry.register(
            dispatcher,
            schema::list_prs(),
            Permission::ReadTools,
            Arc::new(ListPullRequestsTool::new(tracker.clone())),
        );
        registry.register(
            dispatcher,
            schema::list_issues(),
            Permission::ReadTools,
            Arc::new(ListIssuesTool::new(tracker.clone())),
        );
        registry.register(
            dispatcher,
            schema::search_issues(),
            Permission::ReadTools,
            Arc::new(SearchIssuesTool::new(tracker.clone())),
        );
        registry.register(
            dispatcher,
            schema::get_pending_reviews(),
            Permission::ReadTools,
            Arc::new(PendingReviewsTool::new(tracker.clone())),
        );
        registry.register(
            dispatcher,
            schema::create_issue(),
            Permission::WriteTools,
            Arc::new(CreateIssueTool::new(tracker.clone())),
        );
        registry.register(
            dispatcher,
            schema::analyze_issue_priority(),
            Permission::ReadTools,
            Arc::new(AnalyzePriorityTool::new(tracker)),
        );
        registry.register(
            dispatcher,
            schema::get_my_permissions(),
            Permission::ReadTools,
            Arc::new(MyPermissionsTool::new(dispatcher.registry())),
        );

        registry
    }

    fn register(
        &mut self,
        dispatcher: &Dispatcher,
        definition: ToolDefinition,
        required: Permission,
        handler: Arc<dyn ToolHandler>,
    ) {
        let tool = dispatcher.protect(definition.name, required, handler);
        self.tools.push(RegisteredTool { definition, tool });
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter().map(|entry| &entry.definition)
    }

    pub fn get(&self, name: &str) -> Option<&ProtectedTool> {
        self.tools
            .iter()
            .find(|entry| entry.definition.name == name)
            .map(|entry| &entry.tool)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name; `None` when no such tool is registered
    pub async fn call(&self, request: ToolRequest) -> Option<CallToolResult> {
        let tool = self.get(&request.name)?;

        let result = match tool.invoke(request).await {
            Ok(output) => CallToolResult::success(output),
            Err(e) => {
                if let Some(gate) = e.gate_error() {
                    warn!(
                        tool = tool.name(),
                        error = gate.error_code(),
                        reason = gate.reason(),
                        "Tool call rejected"
                    );
                }
                e.into()
            }
        };

        Some(result)
    }
}
