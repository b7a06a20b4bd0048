use super::*;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

fn client_for(server: &MockServer, batch_size: u32) -> OllamaClient {
    let url = Url::parse(&server.uri()).expect("mock server uri");
    let config = OllamaConfig {
        host: url.host_str().unwrap_or("127.0.0.1").to_string(),
        port: url.port().unwrap_or(80),
        batch_size,
        ..OllamaConfig::default()
    };
    OllamaClient::new(&config).expect("Failed to create client")
}

/// Answers `/api/embed` with `[len(text), position-in-batch]` per input
struct LengthEmbeddings;

impl Respond for LengthEmbeddings {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: serde_json::Value =
            serde_json::from_slice(&request.body).expect("embed request is JSON");
        let embeddings: Vec<Vec<f32>> = body["input"]
            .as_array()
            .expect("input array")
            .iter()
            .enumerate()
            .map(|(i, text)| vec![text.as_str().unwrap_or_default().len() as f32, i as f32])
            .collect();
        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

#[test]
fn client_configuration() {
    let config = OllamaConfig {
        host: "test-host".to_string(),
        port: 1234,
        embedding_model: "embed-model".to_string(),
        generation_model: "chat-model".to_string(),
        batch_size: 128,
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(5));

    assert_eq!(client.embedding_model, "embed-model");
    assert_eq!(client.generation_model, "chat-model");
    assert_eq!(client.batch_size, 128);
    assert_eq!(client.base_url().host_str(), Some("test-host"));
    assert_eq!(client.base_url().port(), Some(1234));
}

#[test]
fn model_name_matching() {
    assert!(model_matches("llama3.2:latest", "llama3.2:latest"));
    assert!(model_matches("llama3.2:latest", "llama3.2"));
    assert!(model_matches("llama3.2", "llama3.2:latest"));
    assert!(!model_matches("llama3.2:1b", "llama3.2"));
    assert!(!model_matches("nomic-embed-text:latest", "llama3.2:latest"));
}

#[tokio::test]
async fn embeddings_are_batched_in_order() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "nomic-embed-text:latest" })))
        .respond_with(LengthEmbeddings)
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 2);
    let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
        .iter()
        .map(ToString::to_string)
        .collect();

    let embeddings = client.embed(&texts).expect("embedding should succeed");
    let lengths: Vec<f32> = embeddings.iter().map(|e| e[0]).collect();
    assert_eq!(lengths, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[tokio::test]
async fn empty_input_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(LengthEmbeddings)
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 16);
    assert!(client.embed(&[]).expect("empty input is fine").is_empty());
}

#[tokio::test]
async fn embedding_count_mismatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1, 0.2]] })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 16);
    let result = client.embed(&["one".to_string(), "two".to_string()]);

    let message = match result {
        Err(RagError::Embedding(message)) => message,
        other => panic!("expected embedding error, got {other:?}"),
    };
    assert!(message.contains("Mismatch"), "unexpected message: {message}");
}

#[tokio::test]
async fn embedding_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 16);
    let result = client.embed_query("grace period");
    assert!(matches!(result, Err(RagError::Embedding(_))));
}

#[tokio::test]
async fn generate_sends_non_streaming_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2:latest",
            "prompt": "Say hi",
            "stream": false
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "model": "llama3.2:latest", "response": "hi", "done": true })),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 16);
    assert_eq!(client.generate("Say hi").expect("generation works"), "hi");
}

#[tokio::test]
async fn generate_failure_is_generation_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 16);
    assert!(matches!(
        client.generate("Say hi"),
        Err(RagError::Generation(_))
    ));
}

#[tokio::test]
async fn health_check_requires_both_models() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "nomic-embed-text:latest", "size": 274_302_450 },
                { "name": "llama3.2:latest" }
            ]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 16);
    client.health_check().expect("both models are installed");
    assert_eq!(client.list_models().expect("models").len(), 2);
}

#[tokio::test]
async fn health_check_reports_missing_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "nomic-embed-text:latest" }]
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, 16);
    let error = client.health_check().expect_err("generation model is missing");
    assert!(error.to_string().contains("llama3.2:latest"));
}

#[test]
fn health_check_unreachable_server() {
    let config = OllamaConfig {
        port: 9,
        ..OllamaConfig::default()
    };
    let client = OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_timeout(Duration::from_secs(2));

    assert!(client.health_check().is_err());
}
