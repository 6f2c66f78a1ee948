//! Integration tests for the search API
//!
//! The embedding service, Chroma and Elasticsearch are all played by one
//! wiremock server; the API itself is served on an ephemeral port.

use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use sumi_seek::config::{EmbeddingConfig, IndexConfig, SearchConfig};
use sumi_seek::embedding::OpenAiEmbedder;
use sumi_seek::search::{ChromaIndex, ElasticIndex, HybridSearcher, Retriever};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_backends(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"embedding": [0.1, 0.2, 0.3], "index": 0}]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/collections"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "col-1", "name": "docs"})),
        )
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v1/collections/col-1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ids": [["c1", "c2"]],
            "documents": [["Ownership rules", "Borrowing rules"]],
            "metadatas": [[
                {"document_id": "d1", "title": "Ownership", "url": "https://example.com/own"},
                {"document_id": "d2", "title": "Borrowing", "url": "https://example.com/borrow"}
            ]],
            "distances": [[0.1, 0.5]]
        })))
        .mount(server)
        .await;
}

async fn mount_lexical(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/docs/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"hits": [
                {"_id": "c1", "_score": 0.6, "_source": {
                    "document_id": "d1", "chunk_id": "c1", "text": "Ownership rules",
                    "metadata": {"title": "Ownership", "url": "https://example.com/own"}
                }},
                {"_id": "c3", "_score": 1.0, "_source": {
                    "document_id": "d3", "chunk_id": "c3", "text": "Lifetimes",
                    "metadata": {"title": "Lifetimes"}
                }}
            ]}
        })))
        .mount(server)
        .await;
}

fn retriever(server: &MockServer) -> Retriever {
    let embedding = EmbeddingConfig {
        base_url: format!("{}/v1", server.uri()),
        dimensions: 3,
        ..EmbeddingConfig::default()
    };
    let index = IndexConfig {
        chroma_url: server.uri(),
        elastic_url: server.uri(),
        collection: "docs".to_string(),
        timeout_secs: 5,
    };

    let searcher = HybridSearcher::new(
        Arc::new(OpenAiEmbedder::new(&embedding, "sk-test").unwrap()),
        Arc::new(ChromaIndex::new(&index).unwrap()),
        Arc::new(ElasticIndex::new(&index).unwrap()),
        &SearchConfig::default(),
    );
    Retriever::new(searcher)
}

async fn spawn_api(retriever: Retriever) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = sumi_seek::server::router(retriever);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn test_health() {
    let backend = MockServer::start().await;
    let addr = spawn_api(retriever(&backend)).await;

    let body: Value = reqwest::get(format!("http://{}/api/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn test_get_search_fuses_backends() {
    let backend = MockServer::start().await;
    mount_backends(&backend).await;
    mount_lexical(&backend).await;
    let addr = spawn_api(retriever(&backend)).await;

    let response = reqwest::get(format!("http://{}/api/search?q=ownership&limit=2", addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["query"], "ownership");
    assert_eq!(body["total"], 2);

    let results = body["results"].as_array().unwrap();
    assert_eq!(results[0]["chunk_id"], "c1");
    assert_eq!(results[0]["title"], "Ownership");
    assert_eq!(results[0]["url"], "https://example.com/own");
    assert!((results[0]["score"].as_f64().unwrap() - 0.621).abs() < 1e-4);
    assert_eq!(results[1]["chunk_id"], "c2");
}

#[tokio::test]
async fn test_post_search_with_query_alias() {
    let backend = MockServer::start().await;
    mount_backends(&backend).await;
    mount_lexical(&backend).await;
    let addr = spawn_api(retriever(&backend)).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(format!("http://{}/api/search", addr))
        .json(&json!({"query": "ownership", "limit": 1}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 1);

    let body: Value = client
        .get(format!("http://{}/api/search?query=ownership", addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn test_search_degrades_when_lexical_backend_is_down() {
    let backend = MockServer::start().await;
    mount_backends(&backend).await;
    Mock::given(method("POST"))
        .and(path("/docs/_search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&backend)
        .await;
    let addr = spawn_api(retriever(&backend)).await;

    let body: Value = reqwest::get(format!("http://{}/api/search?q=borrowing", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let ids: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["chunk_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}

#[tokio::test]
async fn test_bad_requests() {
    let backend = MockServer::start().await;
    let addr = spawn_api(retriever(&backend)).await;
    let client = reqwest::Client::new();

    let missing = client
        .get(format!("http://{}/api/search", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 400);

    let blank = client
        .post(format!("http://{}/api/search", addr))
        .json(&json!({"query": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(blank.status(), 400);

    let malformed = client
        .post(format!("http://{}/api/search", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status(), 400);
}

#[tokio::test]
async fn test_search_fails_when_all_backends_are_down() {
    // The embedding and Chroma calls fall through to wiremock's 404
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/docs/_search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backend)
        .await;
    let addr = spawn_api(retriever(&backend)).await;

    let response = reqwest::get(format!("http://{}/api/search?q=anything", addr))
        .await
        .unwrap();

    assert_eq!(response.status(), 500);
}
