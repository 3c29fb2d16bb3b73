//! Newline delimited JSON-RPC over stdin and stdout
//!
//! Stdout carries protocol messages only. Every call on the session is made
//! with the bearer token configured for the process.

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::protocol::McpHandler;
use crate::{ServerError, ServerResult};

/// Headers presented on behalf of every stdio call
///
/// Without a token no `Authorization` header is sent and every protected
/// tool rejects the call.
pub fn session_headers(auth_token: Option<&str>) -> ServerResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let Some(token) = auth_token.map(str::trim).filter(|token| !token.is_empty()) else {
        warn!("MCP_AUTH_TOKEN is not set, tool calls will be rejected");
        return Ok(headers);
    };

    let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
        ServerError::Config("MCP_AUTH_TOKEN is not a valid header value".to_string())
    })?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Serve one session until end of input or shutdown
pub async fn serve<R, W>(
    handler: &McpHandler,
    headers: &HeaderMap,
    reader: R,
    mut writer: W,
    shutdown: CancellationToken,
) -> ServerResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shutdown requested, closing stdio session");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            debug!("Input closed");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(response) = handler.handle_text(line, headers, &shutdown).await {
            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;
        }
    }

    Ok(())
}

/// Serve the process's own stdin and stdout
pub async fn run(
    handler: McpHandler,
    auth_token: Option<&str>,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    let headers = session_headers(auth_token)?;
    info!(tools = handler.tools().len(), "Serving MCP over stdio");

    serve(
        &handler,
        &headers,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        shutdown,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_becomes_bearer_header() {
        let headers = session_headers(Some("a.b.c")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer a.b.c");
    }

    #[test]
    fn test_missing_token_sends_no_header() {
        assert!(session_headers(None).unwrap().is_empty());
        assert!(session_headers(Some("  ")).unwrap().is_empty());
    }

    #[test]
    fn test_unencodable_token_is_a_config_error() {
        let err = session_headers(Some("bad\ntoken")).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
