//! HTTP Client Factory
//!
//! Builds reqwest clients with proxy and timeout settings for every remote
//! backend in the workspace.

use std::time::Duration;

use agentic_rag_core::error::{CoreError, CoreResult};
use agentic_rag_core::proxy::ProxyConfig;

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> configure proxy on the client
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(
    proxy: Option<&ProxyConfig>,
    timeout: Option<Duration>,
) -> CoreResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    match proxy {
        Some(cfg) => {
            cfg.validate()?;
            let mut p = reqwest::Proxy::all(cfg.url())
                .map_err(|e| CoreError::config(format!("invalid proxy URL: {}", e)))?;
            if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                p = p.basic_auth(u, pw);
            }
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| CoreError::internal(format!("failed to build HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_rag_core::proxy::ProxyProtocol;

    #[test]
    fn test_build_http_client_no_proxy() {
        assert!(build_http_client(None, Some(Duration::from_secs(5))).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let cfg = ProxyConfig {
            protocol: ProxyProtocol::Http,
            host: "127.0.0.1".to_string(),
            port: 8080,
            username: Some("user".to_string()),
            password: Some("pw".to_string()),
        };
        assert!(build_http_client(Some(&cfg), None).is_ok());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let cfg = ProxyConfig {
            protocol: ProxyProtocol::Http,
            host: String::new(),
            port: 8080,
            username: None,
            password: None,
        };
        assert!(matches!(
            build_http_client(Some(&cfg), None),
            Err(CoreError::Config(_))
        ));
    }
}
