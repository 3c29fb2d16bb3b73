//! MCP JSON-RPC 2.0 message handling
//!
//! The handler is transport agnostic: stdio and HTTP both hand it one
//! message plus the headers the caller presented, and write back whatever it
//! returns. Notifications produce no response.

use gitmcp_auth::ToolRequest;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tools::ToolRegistry;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "GitHub MCP Server";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// `None` only when the member is absent; an explicit `null` is `Some(Null)`
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Value,
}

/// Routes JSON-RPC messages to the tool registry
#[derive(Clone)]
pub struct McpHandler {
    tools: Arc<ToolRegistry>,
}

impl McpHandler {
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Handle one raw message, answering parse failures with -32700
    pub async fn handle_text(
        &self,
        text: &str,
        headers: &HeaderMap,
        cancellation: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(text) {
            Ok(message) => self.handle_value(message, headers, cancellation).await,
            Err(e) => {
                warn!(error = %e, "Unparsable message");
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {}", e),
                ))
            }
        }
    }

    pub async fn handle_value(
        &self,
        message: Value,
        headers: &HeaderMap,
        cancellation: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        let id = message.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id,
                    INVALID_REQUEST,
                    format!("invalid request: {}", e),
                ))
            }
        };

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
            ));
        }

        self.handle_request(request, headers, cancellation).await
    }

    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        headers: &HeaderMap,
        cancellation: &CancellationToken,
    ) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "Handling request");

        if request.is_notification() {
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                json!({ "tools": self.tools.definitions().collect::<Vec<_>>() }),
            ),
            "tools/call" => self.call_tool(id, request.params, headers, cancellation).await,
            method => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {}", method),
            ),
        };

        Some(response)
    }

    fn initialize_result(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(
        &self,
        id: Value,
        params: Value,
        headers: &HeaderMap,
        cancellation: &CancellationToken,
    ) -> JsonRpcResponse {
        let params: CallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::failure(
                    id,
                    INVALID_PARAMS,
                    format!("invalid params: {}", e),
                )
            }
        };
        let Some(name) = params.name else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "missing tool name");
        };

        let request = ToolRequest::new(name.clone(), params.arguments, headers.clone())
            .with_cancellation(cancellation.child_token());

        match self.tools.call(request).await {
            Some(result) => match serde_json::to_value(result) {
                Ok(result) => JsonRpcResponse::success(id, result),
                Err(e) => JsonRpcResponse::failure(
                    id,
                    INTERNAL_ERROR,
                    format!("failed to encode result: {}", e),
                ),
            },
            None => {
                JsonRpcResponse::failure(id, INVALID_PARAMS, format!("unknown tool: {}", name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(message: Value) -> JsonRpcRequest {
        serde_json::from_value(message).unwrap()
    }

    #[test]
    fn test_null_id_is_a_request() {
        let request = parse(json!({"jsonrpc": "2.0", "id": null, "method": "ping"}));
        assert_eq!(request.id, Some(Value::Null));
        assert!(!request.is_notification());
    }

    #[test]
    fn test_missing_id_is_a_notification() {
        let request = parse(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}));
        assert!(request.id.is_none());
        assert!(request.is_notification());
        assert_eq!(request.params, Value::Null);
    }

    #[test]
    fn test_ids_keep_their_type() {
        assert_eq!(
            parse(json!({"jsonrpc": "2.0", "id": "abc", "method": "ping"})).id,
            Some(json!("abc"))
        );
        assert_eq!(
            parse(json!({"jsonrpc": "2.0", "id": 7, "method": "ping"})).id,
            Some(json!(7))
        );
    }
}
