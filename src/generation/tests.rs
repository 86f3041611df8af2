use super::*;
use crate::config::Config;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generator_for(server_uri: &str) -> OllamaGenerator {
    let url = Url::parse(server_uri).expect("mock server uri should parse");
    let mut config = Config::load("/nonexistent").expect("defaults should load");
    config.ollama.host = url.host_str().expect("mock server has host").to_string();
    config.ollama.port = url.port().expect("mock server has port");
    config.ollama.generation_model = "test-llm".to_string();
    config.generation.temperature = 0.7;
    config.generation.max_tokens = 64;
    config.generation.stop = vec!["\n\n".to_string()];

    OllamaGenerator::new(&config).expect("generator should build")
}

#[test]
fn default_params() {
    let params = GenerationParams::default();
    assert_eq!(params.temperature, 0.2);
    assert_eq!(params.max_tokens, 512);
    assert!(params.stop.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn generate_returns_response_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-llm",
            "stream": false,
            "options": {
                "temperature": 0.7,
                "num_predict": 64,
                "stop": ["\n\n"]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "model": "test-llm",
            "response": "Answer: forty-two.",
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator_for(&server.uri());
    let answer = tokio::task::spawn_blocking(move || generator.generate("what is the answer?"))
        .await
        .expect("task should join")
        .expect("generation should succeed");

    assert_eq!(answer, "Answer: forty-two.");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_surfaces_as_generation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let generator = generator_for(&server.uri());
    let result = tokio::task::spawn_blocking(move || generator.generate("question"))
        .await
        .expect("task should join");

    assert!(matches!(result, Err(QaError::Generation(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_response_surfaces_as_generation_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let generator = generator_for(&server.uri());
    let result = tokio::task::spawn_blocking(move || generator.generate("question"))
        .await
        .expect("task should join");

    assert!(matches!(result, Err(QaError::Generation(_))));
}
