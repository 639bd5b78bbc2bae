use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use relay_server::{build, ServerConfig, StoreBackend};
use tower::ServiceExt;

fn memory_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        key_prefix: "uploads".to_string(),
        store: StoreBackend::Memory,
    }
}

#[tokio::test]
async fn health_routes_answer_ok() {
    let router = build(&memory_config()).await.unwrap().into_router();

    for path in ["/", "/health"] {
        let res = router
            .clone()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 200);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ok");
    }
}

#[tokio::test]
async fn cors_preflight_is_allowed() {
    let router = build(&memory_config()).await.unwrap().into_router();

    let res = router
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/s3/multipart")
                .header("origin", "https://app.example.com")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(res.status().is_success());
    assert_eq!(
        res.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn configured_prefix_reaches_generated_keys() {
    let router = build(&memory_config()).await.unwrap().into_router();

    let res = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/s3/multipart")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"filename":"a.bin","type":"application/octet-stream"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 201);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["key"].as_str().unwrap().starts_with("uploads/"));
}
