//! Pinecone client tests against a mock data plane

use aso_core::{AsoError, IndexConfig, SolutionMetadata};
use aso_vector::{IndexQuery, IndexRecord, MetadataFilter, PineconeIndex, VectorIndex};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "pc-test";
const INDEX: &str = "agent-stack-overflow";
const NAMESPACE: &str = "agent-solutions";

fn index_for(server: &MockServer) -> PineconeIndex {
    PineconeIndex::new(API_KEY, INDEX, NAMESPACE).with_host(server.uri())
}

fn metadata() -> SolutionMetadata {
    SolutionMetadata {
        error_type: "TypeError".to_string(),
        error_message: "cannot read x of undefined".to_string(),
        agent_summary: "null deref".to_string(),
        solution_payload: "add null check".to_string(),
        agent_explanation: "guard before access".to_string(),
        language: "typescript".to_string(),
        library: Some("react".to_string()),
        created_at: "2024-05-01T12:00:00+00:00".to_string(),
    }
}

fn query(filter: Option<MetadataFilter>) -> IndexQuery {
    IndexQuery {
        vector: vec![0.5, 0.25],
        top_k: 5,
        include_metadata: true,
        filter,
    }
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    requests.last().unwrap().body_json().unwrap()
}

#[tokio::test]
async fn test_upsert_sends_headers_and_namespace() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .and(header("Api-Key", API_KEY))
        .and(header("X-Pinecone-API-Version", "2024-07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upsertedCount": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    index_for(&server)
        .upsert(vec![IndexRecord {
            id: "abc".to_string(),
            values: vec![0.5, 0.25],
            metadata: metadata(),
        }])
        .await
        .unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["namespace"], NAMESPACE);
    assert_eq!(body["vectors"][0]["id"], "abc");
    assert_eq!(body["vectors"][0]["values"], json!([0.5, 0.25]));
    assert_eq!(body["vectors"][0]["metadata"]["language"], "typescript");
    assert_eq!(body["vectors"][0]["metadata"]["library"], "react");
}

#[tokio::test]
async fn test_query_without_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .and(header("Api-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "id": "abc", "score": 0.91, "metadata": metadata() },
                { "id": "def" }
            ],
            "namespace": NAMESPACE
        })))
        .mount(&server)
        .await;

    let matches = index_for(&server).query(query(None)).await.unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "abc");
    assert_eq!(matches[0].score, Some(0.91));
    assert_eq!(matches[0].metadata.as_ref().unwrap().agent_summary, "null deref");
    assert!(matches[1].score.is_none());

    let body = last_body(&server).await;
    assert_eq!(body["namespace"], NAMESPACE);
    assert_eq!(body["topK"], 5);
    assert_eq!(body["includeMetadata"], true);
    assert_eq!(body["includeValues"], false);
    assert!(body.get("filter").is_none());
}

#[tokio::test]
async fn test_query_with_environment_filter() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
        .mount(&server)
        .await;

    let matches = index_for(&server)
        .query(query(Some(MetadataFilter {
            language: "typescript".to_string(),
            library: "react".to_string(),
        })))
        .await
        .unwrap();
    assert!(matches.is_empty());

    let body = last_body(&server).await;
    assert_eq!(
        body["filter"],
        json!({
            "language": { "$eq": "typescript" },
            "library": { "$eq": "react" }
        })
    );
}

#[tokio::test]
async fn test_fetch_hit_and_miss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .and(query_param("ids", "abc"))
        .and(query_param("namespace", NAMESPACE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": {
                "abc": { "id": "abc", "values": [0.5, 0.25], "metadata": metadata() }
            },
            "namespace": NAMESPACE
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/vectors/fetch"))
        .and(query_param("ids", "missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vectors": {},
            "namespace": NAMESPACE
        })))
        .mount(&server)
        .await;

    let index = index_for(&server);

    let hit = index.fetch("abc").await.unwrap().unwrap();
    assert_eq!(hit.id, "abc");
    assert!(hit.score.is_none());
    assert_eq!(hit.metadata.unwrap().error_type, "TypeError");

    assert!(index.fetch("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_host_resolved_once_from_control_plane() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/indexes/{INDEX}")))
        .and(header("Api-Key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": INDEX,
            "dimension": 3072,
            "host": server.uri()
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "matches": [] })))
        .expect(2)
        .mount(&server)
        .await;

    let config = IndexConfig {
        api_key: Some(API_KEY.to_string()),
        name: INDEX.to_string(),
        namespace: NAMESPACE.to_string(),
        pinecone_host: None,
        pinecone_control_url: server.uri(),
        ..Default::default()
    };
    let index = PineconeIndex::from_config(&config).unwrap();

    index.query(query(None)).await.unwrap();
    index.query(query(None)).await.unwrap();
}

#[tokio::test]
async fn test_error_status_becomes_index_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vectors/upsert"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let index = index_for(&server);

    let err = index.query(query(None)).await.unwrap_err();
    assert!(matches!(err, AsoError::Index(_)));
    assert!(err.to_string().contains("500"));
    assert!(err.to_string().contains("backend unavailable"));

    let err = index
        .upsert(vec![IndexRecord {
            id: "abc".to_string(),
            values: vec![0.5],
            metadata: metadata(),
        }])
        .await
        .unwrap_err();
    assert!(matches!(err, AsoError::Index(_)));
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_failed_host_lookup_is_index_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/indexes/{INDEX}")))
        .respond_with(ResponseTemplate::new(404).set_body_string("index not found"))
        .mount(&server)
        .await;

    let config = IndexConfig {
        api_key: Some(API_KEY.to_string()),
        pinecone_control_url: server.uri(),
        ..Default::default()
    };
    let index = PineconeIndex::from_config(&config).unwrap();

    let err = index.fetch("abc").await.unwrap_err();
    assert!(matches!(err, AsoError::Index(_)));
    assert!(err.to_string().contains("describe index"));
}
