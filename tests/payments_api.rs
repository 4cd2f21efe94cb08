use payments_api::config::AppConfig;
use payments_api::store::{self, IN_MEMORY_URI};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
            .expect("POST failed")
    }

    async fn post_raw(&self, path: &str, body: &'static str) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("POST failed")
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Response {
        self.client
            .put(&format!("{}{}", self.base_url, path))
            .json(&json)
            .send()
            .await
            .expect("PUT failed")
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("GET failed")
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(&format!("{}{}", self.base_url, path))
            .send()
            .await
            .expect("DELETE failed")
    }
}

/// Serve the API over a fresh in-memory SQLite store on an ephemeral port
async fn spawn_app(max_results: i64) -> TestClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let mut config = AppConfig::default();
    config.database.connection_string = Some(IN_MEMORY_URI.to_string());
    config.database.migrations = Some("migrations/sqlite".to_string());
    config.api.external_url = base_url.clone();
    config.api.max_results = max_results;
    config.api.admin = true;

    let store = store::connect(&config.database).await.unwrap();
    let app = payments_api::build_app(store, &config);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestClient::new(base_url)
}

fn payment(id: &str, version: i64, amount: &str) -> Value {
    json!({
        "data": {
            "id": id,
            "type": "Payment",
            "version": version,
            "organisation_id": "org1",
            "attributes": {"amount": amount}
        }
    })
}

async fn create(client: &TestClient, id: &str) {
    let resp = client.post("/v1/payments", payment(id, 0, "1.00")).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "creating {}", id);
}

async fn assert_empty_error(resp: reqwest::Response, status: StatusCode) {
    assert_eq!(resp.status(), status);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn test_create_payment() {
    let client = spawn_app(20).await;

    let resp = client.post("/v1/payments", payment("p1", 0, "1.00")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], "p1");
    assert_eq!(body["data"]["type"], "Payment");
    assert_eq!(body["data"]["version"], 0);
    assert_eq!(body["data"]["organisation_id"], "org1");
    assert_eq!(body["data"]["attributes"]["amount"], "1.00");
    assert_eq!(
        body["links"]["self"],
        format!("{}/v1/payments/p1", client.base_url)
    );

    // Same id again
    let resp = client.post("/v1/payments", payment("p1", 0, "1.00")).await;
    assert_empty_error(resp, StatusCode::CONFLICT).await;
}

#[tokio::test]
async fn test_create_rejects_bad_payloads() {
    let client = spawn_app(20).await;

    assert_empty_error(
        client.post_raw("/v1/payments", "{not json").await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_empty_error(
        client.post_raw("/v1/payments", "{}").await,
        StatusCode::BAD_REQUEST,
    )
    .await;

    for invalid in [
        payment(" ", 0, "1.00"),
        payment("p1", 0, "abc"),
        payment("p1", 0, "0"),
        payment("p1", 0, "-3.50"),
        json!({"data": {"id": "p1", "type": "Refund", "organisation_id": "org1", "attributes": {"amount": "1.00"}}}),
        json!({"data": {"id": "p1", "type": "Payment", "organisation_id": "", "attributes": {"amount": "1.00"}}}),
    ] {
        let resp = client.post("/v1/payments", invalid.clone()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {}", invalid);
    }

    // Nothing was written
    let info: Value = client.get("/admin/repo").await.json().await.unwrap();
    assert_eq!(info["count"], 0);
}

#[tokio::test]
async fn test_fetch_payment() {
    let client = spawn_app(20).await;
    create(&client, "p1").await;

    let first: Value = client.get("/v1/payments/p1").await.json().await.unwrap();
    let second: Value = client.get("/v1/payments/p1").await.json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first["data"]["id"], "p1");
    assert_eq!(
        first["links"],
        json!({"self": format!("{}/v1/payments/p1", client.base_url)})
    );

    assert_empty_error(client.get("/v1/payments/missing").await, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn test_update_with_stale_version_conflicts() {
    let client = spawn_app(20).await;
    create(&client, "p1").await;

    let resp = client.put("/v1/payments/p1", payment("p1", 0, "2.00")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["version"], 1);
    assert_eq!(body["data"]["attributes"]["amount"], "2.00");

    // Version 0 is gone now
    let resp = client.put("/v1/payments/p1", payment("p1", 0, "3.00")).await;
    assert_empty_error(resp, StatusCode::CONFLICT).await;

    let stored: Value = client.get("/v1/payments/p1").await.json().await.unwrap();
    assert_eq!(stored["data"]["version"], 1);
    assert_eq!(stored["data"]["attributes"]["amount"], "2.00");
}

#[tokio::test]
async fn test_update_errors() {
    let client = spawn_app(20).await;
    create(&client, "p1").await;

    // Body and path disagree on the id
    let resp = client.put("/v1/payments/p1", payment("p2", 0, "2.00")).await;
    assert_empty_error(resp, StatusCode::BAD_REQUEST).await;

    let resp = client.put("/v1/payments/p1", payment("p1", 0, "zero")).await;
    assert_empty_error(resp, StatusCode::BAD_REQUEST).await;

    let resp = client.put("/v1/payments/p9", payment("p9", 0, "2.00")).await;
    assert_empty_error(resp, StatusCode::NOT_FOUND).await;
}

#[tokio::test]
async fn test_update_at_max_version_conflicts() {
    let client = spawn_app(20).await;
    create(&client, "p1").await;

    let resp = client
        .put("/v1/payments/p1", payment("p1", i64::MAX, "2.00"))
        .await;
    assert_empty_error(resp, StatusCode::CONFLICT).await;

    let body: Value = client.get("/v1/payments/p1").await.json().await.unwrap();
    assert_eq!(body["data"]["version"], 0);
}

#[tokio::test]
async fn test_self_link_escapes_id() {
    let client = spawn_app(20).await;

    let resp = client.post("/v1/payments", payment("a b?c", 0, "1.00")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    let self_link = body["links"]["self"].as_str().unwrap().to_string();
    assert_eq!(
        self_link,
        format!("{}/v1/payments/a%20b%3Fc", client.base_url)
    );

    let resp = client.client.get(&self_link).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], "a b?c");
}

#[tokio::test]
async fn test_malformed_query_is_empty_error() {
    let client = spawn_app(20).await;
    create(&client, "p1").await;

    let resp = client.get("/v1/payments?from=0&from=1").await;
    assert_empty_error(resp, StatusCode::BAD_REQUEST).await;

    let resp = client.delete("/v1/payments/p1?version=0&version=1").await;
    assert_empty_error(resp, StatusCode::BAD_REQUEST).await;

    // Nothing was deleted
    assert_eq!(client.get("/v1/payments/p1").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_payment() {
    let client = spawn_app(20).await;
    create(&client, "p1").await;
    let resp = client.put("/v1/payments/p1", payment("p1", 0, "2.00")).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.delete("/v1/payments/p1?version=1").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(resp.bytes().await.unwrap().is_empty());

    assert_empty_error(client.get("/v1/payments/p1").await, StatusCode::NOT_FOUND).await;
    assert_empty_error(
        client.delete("/v1/payments/p1?version=1").await,
        StatusCode::NOT_FOUND,
    )
    .await;
}

#[tokio::test]
async fn test_delete_errors() {
    let client = spawn_app(20).await;
    create(&client, "p1").await;

    for path in [
        "/v1/payments/p1",
        "/v1/payments/p1?version=",
        "/v1/payments/p1?version=abc",
    ] {
        assert_empty_error(client.delete(path).await, StatusCode::BAD_REQUEST).await;
    }

    assert_empty_error(
        client.delete("/v1/payments/p9?version=0").await,
        StatusCode::NOT_FOUND,
    )
    .await;

    // Exists but at another version
    assert_empty_error(
        client.delete("/v1/payments/p1?version=4").await,
        StatusCode::CONFLICT,
    )
    .await;

    // Surrounding whitespace in the version is tolerated
    let resp = client.delete("/v1/payments/p1?version=%200%20").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_list_rejects_empty_window() {
    let client = spawn_app(20).await;

    assert_empty_error(
        client.get("/v1/payments?from=5&to=3").await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_empty_error(
        client.get("/v1/payments?from=5&to=5").await,
        StatusCode::BAD_REQUEST,
    )
    .await;
}

#[tokio::test]
async fn test_list_defaults_to_max_results() {
    let client = spawn_app(20).await;
    for i in 0..25 {
        create(&client, &format!("p{:02}", i)).await;
    }

    let body: Value = client.get("/v1/payments").await.json().await.unwrap();
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 20);
    assert_eq!(data[0]["id"], "p00");
    assert_eq!(data[19]["id"], "p19");
    assert_eq!(
        body["links"]["self"],
        format!("{}/v1/payments?from=0&to=20", client.base_url)
    );
    assert_eq!(
        body["links"]["next"],
        format!("{}/v1/payments?from=20&to=40", client.base_url)
    );
    assert!(body["links"].get("prev").is_none());

    let body: Value = client
        .get("/v1/payments?from=20&to=40")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 5);
    assert_eq!(
        body["links"]["prev"],
        format!("{}/v1/payments?from=0&to=20", client.base_url)
    );

    // Windows wider than max_results are clamped
    let body: Value = client
        .get("/v1/payments?from=0&to=100")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn test_list_pages_are_disjoint() {
    let client = spawn_app(20).await;
    for i in 0..10 {
        create(&client, &format!("p{:02}", i)).await;
    }

    let ids = |body: &Value| -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap().to_string())
            .collect()
    };

    let first: Value = client.get("/v1/payments?from=0&to=5").await.json().await.unwrap();
    let second: Value = client.get("/v1/payments?from=5&to=10").await.json().await.unwrap();
    assert_eq!(ids(&first), vec!["p00", "p01", "p02", "p03", "p04"]);
    assert_eq!(ids(&second), vec!["p05", "p06", "p07", "p08", "p09"]);

    // from=3 is below the page size, so there is no prev link even though
    // records exist before it.
    let partial: Value = client.get("/v1/payments?from=3&to=8").await.json().await.unwrap();
    assert_eq!(ids(&partial), vec!["p03", "p04", "p05", "p06", "p07"]);
    assert!(partial["links"].get("prev").is_none());
}

#[tokio::test]
async fn test_deleted_payments_are_hidden_from_list() {
    let client = spawn_app(20).await;
    for id in ["a", "b", "c"] {
        create(&client, id).await;
    }

    let resp = client.delete("/v1/payments/b?version=0").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let body: Value = client.get("/v1/payments").await.json().await.unwrap();
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[tokio::test]
async fn test_health_and_admin() {
    let client = spawn_app(20).await;

    let resp = client.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": "up"}));

    create(&client, "p1").await;
    create(&client, "p2").await;
    let resp = client.delete("/v1/payments/p2?version=0").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let info: Value = client.get("/admin/repo").await.json().await.unwrap();
    assert_eq!(info, json!({"count": 1}));

    let resp = client.delete("/admin/repo").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let info: Value = client.get("/admin/repo").await.json().await.unwrap();
    assert_eq!(info, json!({"count": 0}));

    // The purge also removed the soft-deleted row
    create(&client, "p2").await;
}

#[tokio::test]
async fn test_admin_routes_are_opt_in() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let mut config = AppConfig::default();
    config.database.connection_string = Some(IN_MEMORY_URI.to_string());
    config.database.migrations = Some("migrations/sqlite".to_string());

    let store = store::connect(&config.database).await.unwrap();
    let app = payments_api::build_app(store, &config);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = TestClient::new(base_url);
    assert_eq!(client.get("/admin/repo").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(client.get("/health").await.status(), StatusCode::OK);
}
