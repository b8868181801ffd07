//! Adapter tests against mocked vendor endpoints.

use docwright_core_sdk::prelude::*;
use serde_json::json;
use tokio::sync::mpsc;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GEMINI_PATH: &str = "/v1beta/models/gemini-2.5-flash-preview-04-17:generateContent";

fn chat_completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "object": "chat.completion",
        "created": 1677652288,
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

fn sse_body(tokens: &[&str]) -> String {
    let mut body = String::from("data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for token in tokens {
        let chunk = json!({"choices": [{"index": 0, "delta": {"content": token}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

async fn collect_tokens(mut rx: mpsc::UnboundedReceiver<String>) -> Vec<String> {
    let mut tokens = Vec::new();
    while let Some(token) = rx.recv().await {
        tokens.push(token);
    }
    tokens
}

#[tokio::test]
async fn openai_returns_completion_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": false,
            "messages": [{"role": "user", "content": "Write docs"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("# Guide")))
        .expect(1)
        .mount(&server)
        .await;

    let env = ProviderEnv {
        openai_api_base: Some(server.uri()),
        ..Default::default()
    };
    let resp = llm::generate(
        &env,
        Provider::OpenAI,
        Some("sk-test"),
        "Write docs",
        &GenerationOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(resp.text, "# Guide");
    assert!(resp.grounding_chunks.is_none());
}

#[tokio::test]
async fn openai_uses_environment_key_and_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer sk-env"))
        .and(body_partial_json(json!({"model": "gpt-4.1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let env = ProviderEnv {
        openai_api_base: Some(server.uri()),
        openai_api_key: Some("sk-env".into()),
        openai_model_name: Some("gpt-4.1".into()),
        ..Default::default()
    };
    let resp = llm::generate(&env, Provider::OpenAI, None, "p", &GenerationOptions::default())
        .await
        .unwrap();
    assert_eq!(resp.text, "ok");
}

#[tokio::test]
async fn openai_without_key_returns_mock() {
    let env = ProviderEnv::default();
    let resp = llm::generate(
        &env,
        Provider::OpenAI,
        None,
        "Explain the cache layer",
        &GenerationOptions::default(),
    )
    .await
    .unwrap();
    assert!(resp.text.contains("Mock"));
    assert!(resp.text.contains("API Key"));
    assert!(resp.text.contains("Using model: gpt-4o-mini"));
    assert!(resp.text.contains("Explain the cache layer"));
}

#[tokio::test]
async fn blank_explicit_key_counts_as_missing() {
    let env = ProviderEnv::default();
    let resp = llm::generate(&env, Provider::OpenAI, Some("  "), "p", &GenerationOptions::default())
        .await
        .unwrap();
    assert!(resp.text.starts_with("# Mock OpenAI Response"));
}

#[tokio::test]
async fn openai_streaming_concatenation_matches_text() {
    let server = MockServer::start().await;
    let tokens = ["# Title", "\n\n", "Hello, ", "world", "!"];
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(&tokens), "text/event-stream"))
        .mount(&server)
        .await;

    let env = ProviderEnv {
        openai_api_base: Some(server.uri()),
        ..Default::default()
    };
    let (tx, rx) = mpsc::unbounded_channel();
    let options = GenerationOptions::default().with_stream_sink(tx);
    let resp = llm::generate(&env, Provider::OpenAI, Some("sk-test"), "p", &options)
        .await
        .unwrap();
    drop(options);

    let streamed = collect_tokens(rx).await;
    assert_eq!(streamed, tokens);
    assert_eq!(streamed.concat(), resp.text);
    assert_eq!(resp.text, "# Title\n\nHello, world!");
}

async fn stream_openai_body(body: &str) -> Result<GenerationResponse, GenerationError> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream"))
        .mount(&server)
        .await;
    let env = ProviderEnv {
        openai_api_base: Some(server.uri()),
        ..Default::default()
    };
    let (tx, _rx) = mpsc::unbounded_channel();
    let options = GenerationOptions::default().with_stream_sink(tx);
    llm::generate(&env, Provider::OpenAI, Some("sk-test"), "p", &options).await
}

#[tokio::test]
async fn openai_stream_without_sse_framing_is_vendor_error() {
    let err = stream_openai_body("{\"unexpected\": true}").await.unwrap_err();
    assert!(err.is_vendor());
    let msg = err.to_string();
    assert!(msg.starts_with("OpenAI API error:"), "{msg}");
}

#[tokio::test]
async fn openai_stream_cut_before_done_is_vendor_error() {
    let err = stream_openai_body("data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n")
        .await
        .unwrap_err();
    assert!(err.is_vendor());
    let msg = err.to_string();
    assert!(msg.starts_with("OpenAI API error:"), "{msg}");
    assert!(msg.contains("[DONE]"), "{msg}");
}

#[tokio::test]
async fn openai_stream_done_without_trailing_blank_line_succeeds() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]";
    let resp = stream_openai_body(body).await.unwrap();
    assert_eq!(resp.text, "Hi");
}

#[tokio::test]
async fn openai_vendor_error_is_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "code": "invalid_api_key"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let env = ProviderEnv {
        openai_api_base: Some(server.uri()),
        ..Default::default()
    };
    let err = llm::generate(&env, Provider::OpenAI, Some("bad"), "p", &GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(err.is_vendor());
    let msg = err.to_string();
    assert!(msg.starts_with("OpenAI API error:"), "{msg}");
    assert!(msg.contains("Incorrect API key provided"), "{msg}");
}

#[tokio::test]
async fn openai_null_content_is_unexpected_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;

    let env = ProviderEnv {
        openai_api_base: Some(server.uri()),
        ..Default::default()
    };
    let err = llm::generate(&env, Provider::OpenAI, Some("k"), "p", &GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("text was not a string"));
}

#[tokio::test]
async fn azure_calls_deployment_with_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/docs-gpt/chat/completions"))
        .and(query_param("api-version", "2024-06-01"))
        .and(header("api-key", "az-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completion("azure text")))
        .expect(1)
        .mount(&server)
        .await;

    let env = ProviderEnv::default();
    let options = GenerationOptions {
        azure_endpoint: Some(format!("{}/", server.uri())),
        azure_deployment_name: Some("docs-gpt".into()),
        ..Default::default()
    };
    let resp = llm::generate(&env, Provider::AzureOpenAI, Some("az-key"), "p", &options)
        .await
        .unwrap();
    assert_eq!(resp.text, "azure text");
}

#[tokio::test]
async fn azure_missing_key_or_endpoint_returns_mock() {
    let env = ProviderEnv::default();
    let no_key = llm::generate(&env, Provider::AzureOpenAI, None, "p", &GenerationOptions::default())
        .await
        .unwrap();
    assert!(no_key.text.contains("Mock"));
    assert!(no_key.text.contains("API Key"));

    let no_endpoint = llm::generate(
        &env,
        Provider::AzureOpenAI,
        Some("az-key"),
        "p",
        &GenerationOptions::default(),
    )
    .await
    .unwrap();
    assert!(no_endpoint.text.contains("Mock"));
    assert!(no_endpoint.text.contains("Endpoint"));
}

#[tokio::test]
async fn azure_streaming_concatenation_matches_text() {
    let server = MockServer::start().await;
    let tokens = ["Step ", "one", "\n", "Step two"];
    // Leading content-filter chunk as sent by Azure, with CRLF framing.
    let body = format!(
        "data: {{\"choices\":[],\"prompt_filter_results\":[]}}\r\n\r\n{}",
        sse_body(&tokens)
    );
    Mock::given(method("POST"))
        .and(path("/openai/deployments/dep/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let env = ProviderEnv {
        azure_endpoint: Some(server.uri()),
        azure_api_key: Some("env-key".into()),
        azure_deployment_name: Some("dep".into()),
        ..Default::default()
    };
    let (tx, rx) = mpsc::unbounded_channel();
    let options = GenerationOptions::default().with_stream_sink(tx);
    let resp = llm::generate(&env, Provider::AzureOpenAI, None, "p", &options)
        .await
        .unwrap();
    drop(options);

    let streamed = collect_tokens(rx).await;
    assert_eq!(streamed.concat(), resp.text);
    assert_eq!(resp.text, "Step one\nStep two");
}

#[tokio::test]
async fn azure_vendor_error_names_vendor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": "DeploymentNotFound", "message": "The API deployment for this resource does not exist."}
        })))
        .mount(&server)
        .await;

    let env = ProviderEnv {
        azure_endpoint: Some(server.uri()),
        ..Default::default()
    };
    let err = llm::generate(&env, Provider::AzureOpenAI, Some("k"), "p", &GenerationOptions::default())
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.starts_with("Azure OpenAI API error:"), "{msg}");
    assert!(msg.contains("deployment for this resource does not exist"), "{msg}");
}

#[tokio::test]
async fn gemini_returns_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(header("x-goog-api-key", "g-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": "Write docs"}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("# Concept")))
        .expect(1)
        .mount(&server)
        .await;

    let env = ProviderEnv {
        gemini_api_base: Some(server.uri()),
        ..Default::default()
    };
    let resp = llm::generate(
        &env,
        Provider::Gemini,
        Some("g-key"),
        "Write docs",
        &GenerationOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(resp.text, "# Concept");
    assert!(resp.grounding_chunks.is_none());
}

#[tokio::test]
async fn gemini_without_key_is_an_error() {
    let env = ProviderEnv::default();
    let err = llm::generate(&env, Provider::Gemini, None, "p", &GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::MissingCredential { .. }));
    assert!(err.to_string().contains("API key"));
}

#[tokio::test]
async fn gemini_grounding_preserves_citation_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .and(body_partial_json(json!({"tools": [{"google_search": {}}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "grounded"}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"web": {"uri": "https://first.example", "title": "First"}},
                        {"web": {"uri": "https://second.example", "title": "Second"}}
                    ]
                }
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let env = ProviderEnv {
        gemini_api_base: Some(server.uri()),
        gemini_api_key: Some("env-key".into()),
        ..Default::default()
    };
    let options = GenerationOptions {
        use_grounding: true,
        ..Default::default()
    };
    let resp = llm::generate(&env, Provider::Gemini, None, "p", &options)
        .await
        .unwrap();
    let chunks = resp.grounding_chunks.expect("citations");
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].title, "First");
    assert_eq!(chunks[1].uri, "https://second.example");
    assert!(chunks.iter().all(|c| c.source_kind == SourceKind::Web));
}

#[tokio::test]
async fn gemini_grounding_without_citations_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("plain")))
        .mount(&server)
        .await;

    let env = ProviderEnv {
        gemini_api_base: Some(server.uri()),
        ..Default::default()
    };
    let options = GenerationOptions {
        use_grounding: true,
        ..Default::default()
    };
    let resp = llm::generate(&env, Provider::Gemini, Some("k"), "p", &options)
        .await
        .unwrap();
    assert_eq!(resp.text, "plain");
    assert!(resp.grounding_chunks.is_none());
}

#[tokio::test]
async fn gemini_sink_receives_whole_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("all at once")))
        .mount(&server)
        .await;

    let env = ProviderEnv {
        gemini_api_base: Some(server.uri()),
        ..Default::default()
    };
    let (tx, rx) = mpsc::unbounded_channel();
    let options = GenerationOptions::default().with_stream_sink(tx);
    let resp = llm::generate(&env, Provider::Gemini, Some("k"), "p", &options)
        .await
        .unwrap();
    drop(options);
    assert_eq!(collect_tokens(rx).await, vec![resp.text]);
}

#[tokio::test]
async fn gemini_blocked_response_is_vendor_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })))
        .mount(&server)
        .await;

    let env = ProviderEnv {
        gemini_api_base: Some(server.uri()),
        ..Default::default()
    };
    let err = llm::generate(&env, Provider::Gemini, Some("k"), "p", &GenerationOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Gemini API error:"));
}
