// tests/reddit_fixture.rs
use listing_monitor::{
    sorter, ExistenceProber, Fullname, ListingFetcher, Monitor, MonitorConfig, RedditClient,
};
use std::sync::Arc;

#[tokio::test]
async fn fixture_listing_parses_into_posts() {
    let body: &str = include_str!("fixtures/new_posts.json");
    let client = RedditClient::from_fixture(body);
    let h = client.fetch("/r/rust/new", None).await.unwrap();
    assert_eq!(h.posts.len(), 3);
    assert_eq!(h.posts[0].author, "ferris");

    let order: Vec<String> = sorter::sort(&h).iter().map(|f| f.to_string()).collect();
    assert_eq!(order, vec!["t3_1a2b3c", "t3_1a2b3b", "t3_1a2b3a"]);
}

#[tokio::test]
async fn deleted_author_counts_as_gone() {
    let client = RedditClient::from_fixture(include_str!("fixtures/info_deleted.json"));
    let name: Fullname = "t3_1a2b3c".parse().unwrap();
    assert!(!client.exists(&name).await.unwrap());
}

#[tokio::test]
async fn live_message_exists_and_missing_name_does_not() {
    let client = RedditClient::from_fixture(include_str!("fixtures/message_thread.json"));
    let present: Fullname = "t4_2xyz".parse().unwrap();
    let absent: Fullname = "t4_other".parse().unwrap();
    assert!(client.exists(&present).await.unwrap());
    assert!(!client.exists(&absent).await.unwrap());
}

#[tokio::test]
async fn seeding_from_fixture_records_tip_without_delivering() {
    let client = Arc::new(RedditClient::from_fixture(include_str!(
        "fixtures/new_posts.json"
    )));
    let mut m = Monitor::seed(
        "/r/rust/new",
        client.clone(),
        client,
        MonitorConfig::default(),
    )
    .await
    .unwrap();
    assert_eq!(m.tip().len(), 3);
    assert_eq!(m.tip().cursor().unwrap().to_string(), "t3_1a2b3c");

    // The fixture keeps serving the same page: nothing is new anymore.
    let h = m.update().await.unwrap();
    assert!(h.is_empty());
    assert_eq!(m.blanks(), 1);
}

#[tokio::test]
async fn malformed_fixture_is_a_fetch_error() {
    let client = RedditClient::from_fixture("{\"error\": 429}");
    assert!(client.fetch("/r/rust/new", None).await.is_err());
}
