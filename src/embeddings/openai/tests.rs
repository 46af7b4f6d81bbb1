use super::*;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.openai.base_url = base_url.to_string();
    config.openai.api_key = "sk-test".to_string();
    config.openai.embedding_model = "test-embedding".to_string();
    config.openai.embedding_dimension = 2;
    config.openai.batch_size = 2;
    config
}

fn embedding_body(vectors: &[(usize, [f32; 2])]) -> serde_json::Value {
    let data: Vec<serde_json::Value> = vectors
        .iter()
        .map(|(index, v)| json!({"object": "embedding", "index": index, "embedding": v}))
        .collect();
    json!({"object": "list", "data": data, "model": "test-embedding"})
}

#[test]
fn client_configuration() {
    let client = OpenAiEmbeddings::new(&test_config("http://test-host:1234"))
        .expect("Failed to create client");

    assert_eq!(client.model(), "test-embedding");
    assert_eq!(client.dimension(), 2);
    assert_eq!(client.batch_size, 2);
    assert_eq!(client.base_url.host_str(), Some("test-host"));
    assert_eq!(client.base_url.port(), Some(1234));
}

#[test]
fn debug_output_hides_api_key() {
    let client = OpenAiEmbeddings::new(&test_config("http://localhost:1"))
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5));

    let rendered = format!("{:?}", client);
    assert!(rendered.contains("test-embedding"));
    assert!(!rendered.contains("sk-test"));
}

#[tokio::test(flavor = "multi_thread")]
async fn single_embedding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "test-embedding", "input": ["apple"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[(0, [1.0, 0.0])])))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(&test_config(&server.uri())).expect("client should build");
    let vector = client.embed("apple").expect("embedding should succeed");

    assert_eq!(vector, vec![1.0, 0.0]);
}

#[tokio::test(flavor = "multi_thread")]
async fn batches_follow_batch_size_and_response_index() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["a", "b"]})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(embedding_body(&[(1, [0.0, 1.0]), (0, [1.0, 0.0])])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(body_partial_json(json!({"input": ["c"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_body(&[(0, [0.5, 0.5])])))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(&test_config(&server.uri())).expect("client should build");
    let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let vectors = client.embed_batch(&texts).expect("batch should succeed");

    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_dimension_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}]
        })))
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(&test_config(&server.uri())).expect("client should build");

    assert!(matches!(
        client.embed("apple"),
        Err(QaError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn unauthorized_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(&test_config(&server.uri())).expect("client should build");

    assert!(matches!(client.embed("apple"), Err(QaError::Auth(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(&test_config(&server.uri())).expect("client should build");

    assert!(matches!(client.embed("apple"), Err(QaError::Upstream(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_an_upstream_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = OpenAiEmbeddings::new(&test_config(&server.uri())).expect("client should build");

    assert!(matches!(client.embed("apple"), Err(QaError::Upstream(_))));
}
