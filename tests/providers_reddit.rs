// tests/providers_reddit.rs
use postwatch::config::RedditConfig;
use postwatch::ingest::providers::fixture::FixtureProvider;
use postwatch::ingest::providers::reddit::RedditProvider;
use postwatch::ingest::types::ContentSource;

#[tokio::test]
async fn parses_listing_fixture() {
    let json = std::fs::read_to_string("tests/fixtures/reddit_new.json").expect("fixture");
    let p = FixtureProvider::from_fixture("rust", &json);
    let items = p.fetch_recent("rust", 5).await.expect("ok");

    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.permalink.starts_with("/r/rust/")));
    assert!(items[0].created > items[2].created);
    assert!(p.fetch_recent("golang", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn public_listing_without_credentials() {
    let json = std::fs::read_to_string("tests/fixtures/reddit_new.json").expect("fixture");
    let mut server = mockito::Server::new_async().await;
    let m = server
        .mock("GET", "/r/rust/new.json")
        .match_query(mockito::Matcher::UrlEncoded("limit".into(), "2".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json)
        .create_async()
        .await;

    let p = RedditProvider::new(&RedditConfig::default())
        .unwrap()
        .with_base_urls(&server.url(), &server.url());
    let items = p.fetch_recent("rust", 2).await.unwrap();
    assert_eq!(items.len(), 2);
    m.assert_async().await;
}

#[tokio::test]
async fn oauth_token_is_fetched_once_and_reused() {
    let json = std::fs::read_to_string("tests/fixtures/reddit_new.json").expect("fixture");
    let mut server = mockito::Server::new_async().await;
    let token = server
        .mock("POST", "/api/v1/access_token")
        .with_status(200)
        .with_body(r#"{"access_token":"tok","token_type":"bearer","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await;
    let listing = server
        .mock("GET", "/r/rust/new")
        .match_header("authorization", "Bearer tok")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(json)
        .expect(2)
        .create_async()
        .await;

    let cfg = RedditConfig {
        client_id: Some("id".into()),
        client_secret: Some("secret".into()),
        ..Default::default()
    };
    let p = RedditProvider::new(&cfg)
        .unwrap()
        .with_base_urls(&server.url(), &server.url());
    p.fetch_recent("rust", 5).await.unwrap();
    p.fetch_recent("rust", 5).await.unwrap();

    token.assert_async().await;
    listing.assert_async().await;
}

#[tokio::test]
async fn upstream_error_status_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let _m = server
        .mock("GET", "/r/rust/new.json")
        .match_query(mockito::Matcher::Any)
        .with_status(503)
        .create_async()
        .await;
    let p = RedditProvider::new(&RedditConfig::default())
        .unwrap()
        .with_base_urls(&server.url(), &server.url());
    let err = p.fetch_recent("rust", 5).await.unwrap_err();
    assert!(err.to_string().contains("503"));
}
