#[cfg(test)]
mod tests {
    use evetrade_esi::config::EsiConfig;
    use evetrade_esi::repository::{EsiApiRepository, EsiRepository};
    use evetrade_esi::{EsiClient, EsiError, RateLimiter};
    use evetrade_store::InMemoryCacheStore;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(base_url: &str, max_retries: usize) -> EsiConfig {
        EsiConfig {
            base_url: base_url.to_string(),
            user_agent: "evetrade-tests/0.1.0 (maintainer@example.com)"
                .to_string(),
            timeout: 1,
            connect_timeout: 1,
            max_retries,
            retry_delay_ms: 50,
            requests_per_second: 100,
            slowdown_threshold: 0,
            slowdown_delay_ms: 0,
            default_ttl_hours: 1.0,
            market_ttl_hours: 1.0,
            deal_concurrency: 10,
        }
    }

    fn make_client(base_url: &str, max_retries: usize) -> Arc<EsiClient> {
        let config = make_config(base_url, max_retries);
        let store = Arc::new(InMemoryCacheStore::new());
        let limiter =
            Arc::new(RateLimiter::new(config.rate_limiter_config()));
        Arc::new(
            EsiClient::new(&config, store, limiter)
                .expect("Failed to build client"),
        )
    }

    #[tokio::test]
    async fn test_timeout_then_success_resolves_after_one_retry() {
        let server = MockServer::start().await;
        // First attempt stalls past the client timeout, second succeeds.
        Mock::given(method("GET"))
            .and(path("/status/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_json(json!({"never": "arrives"})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ok": true})),
            )
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 3);
        let body = client.get("/status/", &[]).await.unwrap();
        assert_eq!(body, json!({"ok": true}));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_400_raises_immediately_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universe/stations/0/"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 3);
        let result = client.get("/universe/stations/0/", &[]).await;
        assert!(matches!(result, Err(EsiError::BadRequest { .. })));
    }

    #[tokio::test]
    async fn test_404_raises_immediately_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universe/stations/61000000/"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 3);
        let result = client.get("/universe/stations/61000000/", &[]).await;
        assert!(matches!(result, Err(EsiError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_other_4xx_is_a_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forbidden/"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 3);
        let result = client.get("/forbidden/", &[]).await;
        assert!(matches!(
            result,
            Err(EsiError::Client { status: 403, .. })
        ));
    }

    #[tokio::test]
    async fn test_persistent_5xx_exhausts_all_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky/"))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 2);
        let result = client.get("/flaky/", &[]).await;
        // max_retries = 2 means exactly 3 attempts.
        assert!(matches!(
            result,
            Err(EsiError::Server { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_304_resolves_from_cached_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universe/regions/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("etag", "W/\"abc123\"")
                    .set_body_json(json!([10000001, 10000002])),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        // Second request must carry the stored ETag and gets a 304 back.
        Mock::given(method("GET"))
            .and(path("/universe/regions/"))
            .and(header("if-none-match", "W/\"abc123\""))
            .respond_with(ResponseTemplate::new(304))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 1);
        let first = client.get("/universe/regions/", &[]).await.unwrap();
        let second = client.get("/universe/regions/", &[]).await.unwrap();
        assert_eq!(first, json!([10000001, 10000002]));
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn test_429_with_retry_after_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/markets/10000002/orders/"))
            .respond_with(
                ResponseTemplate::new(429).insert_header("retry-after", "1"),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/markets/10000002/orders/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 3);
        let body = client.get("/markets/10000002/orders/", &[]).await.unwrap();
        assert_eq!(body, json!([]));
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_429_without_retry_after_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/markets/10000002/orders/"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 3);
        let result = client.get("/markets/10000002/orders/", &[]).await;
        assert!(matches!(result, Err(EsiError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_repository_cache_short_circuits_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/universe/regions/10000002/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"region_id": 10000002, "name": "The Forge"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 1);
        let repo = EsiApiRepository::new(client);

        let first = repo.get_region_details(10000002).await.unwrap();
        let second = repo.get_region_details(10000002).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first["name"], "The Forge");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_query_params_reach_the_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/markets/10000002/orders/"))
            .and(wiremock::matchers::query_param("type_id", "34"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = make_client(&server.uri(), 1);
        let body = client
            .get(
                "/markets/10000002/orders/",
                &[("type_id", "34".to_string())],
            )
            .await
            .unwrap();
        assert_eq!(body, json!([]));
    }
}
