// SPDX-FileCopyrightText: 2026 Clonr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request parsing and response emission for the credential protocol.

use std::time::Duration;

use clonr_core::{ClonrError, TokenResolver};
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// Fixed username for token-based HTTPS auth.
pub const GIT_USERNAME: &str = "x-access-token";

/// A parsed credential request.
///
/// Unrecognized keys and malformed lines (no `=`) are ignored rather than
/// failing the read; a repeated key keeps its last value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CredentialRequest {
    pub protocol: Option<String>,
    pub host: Option<String>,
}

impl CredentialRequest {
    /// Whether this request is one clonr answers: HTTPS with a host.
    fn is_supported(&self) -> bool {
        self.protocol.as_deref() == Some("https")
            && self.host.as_deref().is_some_and(|h| !h.is_empty())
    }
}

/// Terminal state of one helper invocation.
#[derive(Debug, PartialEq, Eq)]
pub enum HelperOutcome {
    /// The four-line response was written.
    Resolved,
    /// Non-HTTPS protocol or missing host; nothing written.
    Unsupported,
    /// No profile token for the host; nothing written.
    NoToken,
}

/// Read `key=value` lines up to a blank line or end of input.
pub async fn parse_request<R>(reader: R) -> Result<CredentialRequest, ClonrError>
where
    R: AsyncBufRead + Unpin,
{
    let mut request = CredentialRequest::default();
    let mut lines = reader.lines();

    loop {
        let line = lines.next_line().await.map_err(|e| ClonrError::Internal(
            format!("failed to read credential request: {e}"),
        ))?;
        let Some(line) = line else { break };
        if line.is_empty() {
            break;
        }
        let Some((key, value)) = line.split_once('=') else {
            // Malformed line: ignore, do not fail the whole read.
            continue;
        };
        match key {
            "protocol" => request.protocol = Some(value.to_string()),
            "host" => request.host = Some(value.to_string()),
            _ => {}
        }
    }

    Ok(request)
}

/// Handle one `get` invocation.
///
/// Token resolution is bounded by `resolve_timeout` so a hung local lookup
/// cannot hang git; the timeout surfaces as an error with nothing written to
/// `writer`. All output is buffered and written in a single flush.
pub async fn handle_get<R, W>(
    reader: R,
    mut writer: W,
    resolver: &dyn TokenResolver,
    resolve_timeout: Duration,
) -> Result<HelperOutcome, ClonrError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let request = parse_request(reader).await?;

    if !request.is_supported() {
        debug!(protocol = ?request.protocol, "unsupported credential request -- deferring");
        return Ok(HelperOutcome::Unsupported);
    }
    let host = request.host.as_deref().unwrap_or_default();

    let resolved = tokio::time::timeout(resolve_timeout, resolver.resolve(host))
        .await
        .map_err(|_| ClonrError::Timeout {
            duration: resolve_timeout,
        })??;

    let Some(token) = resolved else {
        debug!(host = %host, "no token for host -- deferring");
        return Ok(HelperOutcome::NoToken);
    };

    let response = render_response(host, &token);
    writer
        .write_all(response.as_bytes())
        .await
        .map_err(|e| ClonrError::Internal(format!("failed to write response: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| ClonrError::Internal(format!("failed to flush response: {e}")))?;

    Ok(HelperOutcome::Resolved)
}

/// Drain and discard a `store` or `erase` request.
///
/// Git expects the helper to consume its input even when it does nothing
/// with it.
pub async fn drain_request<R>(reader: R) -> Result<(), ClonrError>
where
    R: AsyncBufRead + Unpin,
{
    let _ = parse_request(reader).await?;
    Ok(())
}

fn render_response(host: &str, token: &SecretString) -> String {
    format!(
        "protocol=https\nhost={host}\nusername={GIT_USERNAME}\npassword={}\n",
        token.expose_secret()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MapResolver(Vec<(&'static str, &'static str)>);

    #[async_trait]
    impl TokenResolver for MapResolver {
        async fn resolve(&self, host: &str) -> Result<Option<SecretString>, ClonrError> {
            Ok(self
                .0
                .iter()
                .find(|(h, _)| *h == host)
                .map(|(_, t)| SecretString::from(t.to_string())))
        }
    }

    struct HangingResolver;

    #[async_trait]
    impl TokenResolver for HangingResolver {
        async fn resolve(&self, _host: &str) -> Result<Option<SecretString>, ClonrError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }

    #[tokio::test]
    async fn https_request_with_token_yields_four_lines() {
        let input = b"protocol=https\nhost=github.com\n\n" as &[u8];
        let mut output = Vec::new();
        let resolver = MapResolver(vec![("github.com", "ghp_resolved")]);

        let outcome = handle_get(input, &mut output, &resolver, timeout())
            .await
            .unwrap();
        assert_eq!(outcome, HelperOutcome::Resolved);

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "protocol=https",
                "host=github.com",
                "username=x-access-token",
                "password=ghp_resolved",
            ]
        );
    }

    #[tokio::test]
    async fn ssh_protocol_yields_no_output() {
        let input = b"protocol=ssh\nhost=github.com\n\n" as &[u8];
        let mut output = Vec::new();
        let resolver = MapResolver(vec![("github.com", "ghp_resolved")]);

        let outcome = handle_get(input, &mut output, &resolver, timeout())
            .await
            .unwrap();
        assert_eq!(outcome, HelperOutcome::Unsupported);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn missing_host_yields_no_output() {
        let input = b"protocol=https\n\n" as &[u8];
        let mut output = Vec::new();
        let resolver = MapResolver(vec![("github.com", "ghp_resolved")]);

        let outcome = handle_get(input, &mut output, &resolver, timeout())
            .await
            .unwrap();
        assert_eq!(outcome, HelperOutcome::Unsupported);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn unresolvable_host_yields_no_output() {
        let input = b"protocol=https\nhost=gitlab.com\n\n" as &[u8];
        let mut output = Vec::new();
        let resolver = MapResolver(vec![("github.com", "ghp_resolved")]);

        let outcome = handle_get(input, &mut output, &resolver, timeout())
            .await
            .unwrap();
        assert_eq!(outcome, HelperOutcome::NoToken);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn malformed_and_unknown_lines_are_ignored() {
        let input =
            b"this line has no equals\nwwwauth[]=Basic realm=x\nprotocol=https\nusername=ignored\nhost=github.com\n\n"
                as &[u8];
        let request = parse_request(input).await.unwrap();
        assert_eq!(request.protocol.as_deref(), Some("https"));
        assert_eq!(request.host.as_deref(), Some("github.com"));
    }

    #[tokio::test]
    async fn request_ends_at_blank_line() {
        let input = b"protocol=https\n\nhost=github.com\n" as &[u8];
        let request = parse_request(input).await.unwrap();
        // The host line came after the terminator and must not be read.
        assert_eq!(request.host, None);
    }

    #[tokio::test]
    async fn eof_without_blank_line_terminates_request() {
        let input = b"protocol=https\nhost=github.com\n" as &[u8];
        let request = parse_request(input).await.unwrap();
        assert_eq!(request.host.as_deref(), Some("github.com"));
    }

    #[tokio::test]
    async fn repeated_key_keeps_last_value() {
        let input = b"host=first.example\nhost=second.example\n\n" as &[u8];
        let request = parse_request(input).await.unwrap();
        assert_eq!(request.host.as_deref(), Some("second.example"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_resolver_times_out_with_no_output() {
        let input = b"protocol=https\nhost=github.com\n\n" as &[u8];
        let mut output = Vec::new();

        let result = handle_get(
            input,
            &mut output,
            &HangingResolver,
            Duration::from_millis(100),
        )
        .await;

        assert!(matches!(result, Err(ClonrError::Timeout { .. })));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn drain_request_consumes_input_quietly() {
        let input = b"protocol=https\nhost=github.com\nusername=x\npassword=y\n\n" as &[u8];
        drain_request(input).await.unwrap();
    }
}
