use std::sync::Arc;

use github_tools_mcp::config::Config;
use github_tools_mcp::http::{collect_all, GitHubClient};
use httpmock::{Method::GET, MockServer};
use serde_json::{json, Value};

fn page(start: usize, n: usize) -> Value {
    Value::Array((start..start + n).map(|i| json!({ "id": i })).collect())
}

fn client_for(server: &MockServer) -> GitHubClient {
    let cfg = Config {
        token: Some("t".into()),
        api_url: server.base_url(),
        ..Config::default()
    };
    GitHubClient::new(Arc::new(cfg)).unwrap()
}

#[tokio::test]
async fn collects_until_short_page() {
    let server = MockServer::start_async().await;
    let p1 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/users/octo/repos")
                .query_param("per_page", "100")
                .query_param("page", "1")
                .query_param("sort", "pushed")
                .header("authorization", "Bearer t");
            then.status(200).json_body(page(0, 100));
        })
        .await;
    let p2 = server
        .mock_async(|when, then| {
            when.method(GET).path("/users/octo/repos").query_param("page", "2");
            then.status(200).json_body(page(100, 100));
        })
        .await;
    let p3 = server
        .mock_async(|when, then| {
            when.method(GET).path("/users/octo/repos").query_param("page", "3");
            then.status(200).json_body(page(200, 37));
        })
        .await;

    let client = client_for(&server);
    let items = collect_all(&client, "/users/octo/repos", &[("sort", "pushed".to_string())]).await;

    assert_eq!(items.len(), 237);
    assert_eq!(items[0]["id"], 0);
    assert_eq!(items[236]["id"], 236);
    p1.assert_hits_async(1).await;
    p2.assert_hits_async(1).await;
    p3.assert_hits_async(1).await;
}

#[tokio::test]
async fn failed_page_keeps_earlier_results() {
    let server = MockServer::start_async().await;
    let _p1 = server
        .mock_async(|when, then| {
            when.method(GET).path("/orgs/acme/repos").query_param("page", "1");
            then.status(200).json_body(page(0, 100));
        })
        .await;
    let p2 = server
        .mock_async(|when, then| {
            when.method(GET).path("/orgs/acme/repos").query_param("page", "2");
            then.status(502).body("bad gateway");
        })
        .await;

    let client = client_for(&server);
    let items = collect_all(&client, "/orgs/acme/repos", &[]).await;
    assert_eq!(items.len(), 100);
    p2.assert_hits_async(1).await;
}

#[tokio::test]
async fn non_list_first_page_is_empty() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/users/ghost/repos");
            then.status(200).json_body(json!({ "message": "odd" }));
        })
        .await;

    let client = client_for(&server);
    assert!(collect_all(&client, "/users/ghost/repos", &[]).await.is_empty());
    m.assert_hits_async(1).await;
}
