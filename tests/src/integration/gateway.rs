//! # Read-Through Gateway Integration
//!
//! The gateway of a running `CacheNode` in front of the fake Codex node:
//! node info, snapshot streaming and CORS.

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use cache_runtime::{CacheConfig, CacheNode, GatewayConfig};
    use qaku_cache::CodexClientConfig;
    use qaku_telemetry::MetricsRegistry;
    use reqwest::header::{
        ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_TYPE, ORIGIN,
    };
    use reqwest::StatusCode;
    use serde_json::{json, Value};

    use crate::integration::fake_codex::FakeCodex;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    async fn start_gateway(codex: &FakeCodex) -> (CacheNode, SocketAddr) {
        let config = CacheConfig {
            codex: CodexClientConfig::new(codex.url()),
            gateway: GatewayConfig {
                listen_addr: "127.0.0.1:0".parse().unwrap(),
                ..GatewayConfig::default()
            },
            ..CacheConfig::default()
        };
        let mut node = CacheNode::new(
            config,
            MetricsRegistry::unlabeled(),
            "127.0.0.1:0".parse().unwrap(),
        )
        .unwrap();
        node.start().await.unwrap();
        let gateway_addr = node.gateway_addr().unwrap();
        (node, gateway_addr)
    }

    fn url(gateway_addr: SocketAddr, path: &str) -> String {
        format!("http://{gateway_addr}/api/qaku/v1{path}")
    }

    // =============================================================================
    // INFO
    // =============================================================================

    #[tokio::test]
    async fn test_info_returns_peer_id_and_first_address() {
        let codex = FakeCodex::start()
            .await
            .with_announce_addresses(&["/ip4/10.0.0.1/tcp/8070", "/ip4/10.0.0.2/tcp/8070"]);
        let (node, gateway_addr) = start_gateway(&codex).await;

        let response = reqwest::get(url(gateway_addr, "/info")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(
            body,
            json!({"peerId": "16Uiu2HAmFakeCodexNode", "addr": "/ip4/10.0.0.1/tcp/8070"})
        );

        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_info_without_announced_address_is_an_error() {
        let codex = FakeCodex::start().await.with_announce_addresses(&[]);
        let (node, gateway_addr) = start_gateway(&codex).await;

        let response = reqwest::get(url(gateway_addr, "/info")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Codex node announces no address");

        node.shutdown().await;
    }

    // =============================================================================
    // SNAPSHOT
    // =============================================================================

    #[tokio::test]
    async fn test_snapshot_streams_dataset_content() {
        let content = vec![7u8; 256 * 1024];
        let codex = FakeCodex::start().await.with_content("zSnap", &content);
        let (node, gateway_addr) = start_gateway(&codex).await;

        let response = reqwest::get(url(gateway_addr, "/snapshot/zSnap"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/octet-stream"
        );
        assert_eq!(response.content_length(), Some(content.len() as u64));
        assert_eq!(response.bytes().await.unwrap().as_ref(), content.as_slice());
        assert_eq!(codex.data_calls(), 1);
        assert_eq!(codex.storage_calls(), 0);

        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_relays_upstream_status() {
        let codex = FakeCodex::start().await;
        let (node, gateway_addr) = start_gateway(&codex).await;

        let response = reqwest::get(url(gateway_addr, "/snapshot/zMissing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.text().await.unwrap(), "dataset not found");
        assert_eq!(codex.data_calls(), 1);

        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_snapshot_with_unreachable_codex_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = CacheConfig {
            codex: CodexClientConfig::new(format!("http://{addr}")),
            gateway: GatewayConfig {
                listen_addr: "127.0.0.1:0".parse().unwrap(),
                ..GatewayConfig::default()
            },
            ..CacheConfig::default()
        };
        config.codex.connect_timeout = std::time::Duration::from_millis(500);
        let mut node = CacheNode::new(
            config,
            MetricsRegistry::unlabeled(),
            "127.0.0.1:0".parse().unwrap(),
        )
        .unwrap();
        node.start().await.unwrap();
        let gateway_addr = node.gateway_addr().unwrap();

        let response = reqwest::get(url(gateway_addr, "/snapshot/zCID1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        node.shutdown().await;
    }

    // =============================================================================
    // CORS
    // =============================================================================

    #[tokio::test]
    async fn test_cors_allows_configured_origins_only() {
        let codex = FakeCodex::start().await;
        let (node, gateway_addr) = start_gateway(&codex).await;
        let client = reqwest::Client::new();

        for origin in ["http://localhost:3000", "https://qaku.app"] {
            let response = client
                .get(url(gateway_addr, "/info"))
                .header(ORIGIN, origin)
                .send()
                .await
                .unwrap();
            assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], origin);
            assert_eq!(
                response.headers()[ACCESS_CONTROL_EXPOSE_HEADERS],
                "content-length"
            );
        }

        let response = client
            .get(url(gateway_addr, "/info"))
            .header(ORIGIN, "https://evil.example")
            .send()
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());

        node.shutdown().await;
    }

    #[tokio::test]
    async fn test_cors_preflight_for_range_request() {
        let codex = FakeCodex::start().await;
        let (node, gateway_addr) = start_gateway(&codex).await;

        let response = reqwest::Client::new()
            .request(reqwest::Method::OPTIONS, url(gateway_addr, "/snapshot/zCID1"))
            .header(ORIGIN, "https://qaku.app")
            .header("access-control-request-method", "GET")
            .header("access-control-request-headers", "range")
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(
            response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://qaku.app"
        );
        let allowed = response.headers()["access-control-allow-headers"]
            .to_str()
            .unwrap()
            .to_ascii_lowercase();
        assert!(allowed.contains("range"), "{allowed}");
        assert_eq!(codex.data_calls(), 0);

        node.shutdown().await;
    }
}
