mod common;

use common::Route;
use site_styler::config::CacheConfig;
use site_styler::loader::{FetchError, ResourceLoader};
use std::collections::HashMap;
use std::time::Duration;

fn loader() -> ResourceLoader {
    ResourceLoader::new(&CacheConfig::default(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_cache_serves_second_fetch_without_network() {
    let server = common::serve(HashMap::from([("/a.css", Route::ok("body { }"))])).await;
    let loader = loader();
    let url = server.url("/a.css");

    let first = loader.fetch(&url, false).await.unwrap();
    let second = loader.fetch(&url, false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(&*first, "body { }");
    assert_eq!(server.hits(), 1, "second fetch must be a cache hit");
}

#[tokio::test]
async fn test_bypass_cache_always_refetches() {
    let server = common::serve(HashMap::from([("/version.json", Route::ok("{}"))])).await;
    let loader = loader();
    let url = server.url("/version.json");

    loader.fetch(&url, true).await.unwrap();
    loader.fetch(&url, true).await.unwrap();
    assert_eq!(server.hits(), 2);

    // Bypassed fetches must not have populated the cache either
    loader.fetch(&url, false).await.unwrap();
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn test_query_string_is_part_of_the_key() {
    let server = common::serve(HashMap::from([
        ("/a.css?v=1", Route::ok("one")),
        ("/a.css?v=2", Route::ok("two")),
    ]))
    .await;
    let loader = loader();

    let one = loader.fetch(&server.url("/a.css?v=1"), false).await.unwrap();
    let two = loader.fetch(&server.url("/a.css?v=2"), false).await.unwrap();

    assert_eq!(&*one, "one");
    assert_eq!(&*two, "two");
    assert_eq!(server.hits(), 2, "cache busting via query param must work");
}

#[tokio::test]
async fn test_disabled_cache_refetches() {
    let server = common::serve(HashMap::from([("/a.css", Route::ok("x"))])).await;
    let cache = CacheConfig {
        enable: false,
        ..CacheConfig::default()
    };
    let loader = ResourceLoader::new(&cache, Duration::from_secs(5));
    let url = server.url("/a.css");

    loader.fetch(&url, false).await.unwrap();
    loader.fetch(&url, false).await.unwrap();
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_non_2xx_is_a_status_error() {
    let server = common::serve(HashMap::new()).await;
    let loader = loader();

    let err = loader.fetch(&server.url("/missing.css"), false).await.unwrap_err();
    match err {
        FetchError::Status { status, .. } => assert_eq!(status, 404),
        other => panic!("expected status error, got {other:?}"),
    }

    // The tolerant variant maps it to absence
    assert!(loader.fetch_ok(&server.url("/missing.css"), false).await.is_none());
}

#[tokio::test]
async fn test_failed_fetches_are_not_cached() {
    let server = common::serve(HashMap::new()).await;
    let loader = loader();
    let url = server.url("/missing.css");

    assert!(loader.fetch(&url, false).await.is_err());
    assert!(loader.fetch(&url, false).await.is_err());
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_connection_refused_is_a_network_error() {
    // Bind and immediately drop a listener to get a dead port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let loader = loader();
    let err = loader
        .fetch(&format!("http://{addr}/a.css"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_slow_response_is_a_timeout() {
    let server = common::serve(HashMap::from([(
        "/slow.css",
        Route::slow("late", Duration::from_secs(5)),
    )]))
    .await;
    let loader = ResourceLoader::new(&CacheConfig::default(), Duration::from_millis(200));

    let err = loader.fetch(&server.url("/slow.css"), false).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }), "got {err:?}");
}
