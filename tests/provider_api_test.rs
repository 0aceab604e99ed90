// Wire-level adapter behavior against a mock HTTP server
//
// Each adapter is pointed at a local mockito server and exercised through
// the `ProviderClient` trait: request shape (paths, auth headers, JSON
// body), buffered and streaming response decoding, and error mapping for
// non-2xx and unreachable hosts.

use mockito::Matcher;
use serde_json::json;

use cmdsage::config::ProviderConfig;
use cmdsage::providers::anthropic::AnthropicClient;
use cmdsage::providers::ollama::OllamaClient;
use cmdsage::providers::openai::OpenAiClient;
use cmdsage::providers::openrouter::OpenRouterClient;
use cmdsage::providers::{ChatMessage, ChatOptions, ProviderClient, ProviderError};

fn local_config(host_url: String) -> ProviderConfig {
    ProviderConfig::Local {
        host_url,
        model: "llama3.2".to_string(),
        timeout_ms: 10_000,
    }
}

fn openai_config(base_url: String) -> ProviderConfig {
    ProviderConfig::OpenAi {
        model: "gpt-4o-mini".to_string(),
        timeout_ms: 10_000,
        base_url: Some(base_url),
        organization_id: None,
    }
}

// Ollama

#[tokio::test]
async fn ollama_buffered_chat_returns_message_content() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "model": "llama3.2",
            "stream": false,
            "messages": [{"role": "user", "content": "list files"}],
        })))
        .with_status(200)
        .with_body(
            json!({
                "message": {"role": "assistant", "content": "{\"command\":\"ls\"}"},
                "done": true,
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OllamaClient::new(local_config(server.url())).unwrap();
    let answer = client
        .chat(&[ChatMessage::user("list files")], ChatOptions::buffered())
        .await
        .unwrap();

    assert_eq!(answer, r#"{"command":"ls"}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn ollama_json_mode_sets_format_field() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"format": "json"})))
        .with_status(200)
        .with_body(json!({"message": {"role": "assistant", "content": "{}"}, "done": true}).to_string())
        .create_async()
        .await;

    let client = OllamaClient::new(local_config(server.url())).unwrap();
    client
        .chat(
            &[ChatMessage::user("hi")],
            ChatOptions::buffered().json_only(),
        )
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn ollama_streaming_concatenates_frames_and_skips_malformed_lines() {
    let mut server = mockito::Server::new_async().await;
    // Three NDJSON frames with a truncated line in the middle
    let body = concat!(
        r#"{"message":{"role":"assistant","content":"ls"},"done":false}"#,
        "\n",
        r#"{"message":{"role":"assist"#,
        "\n",
        r#"{"message":{"role":"assistant","content":" -la"},"done":false}"#,
        "\n",
        r#"{"message":{"role":"assistant","content":""},"done":true}"#,
        "\n",
    );
    server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = OllamaClient::new(local_config(server.url())).unwrap();
    let mut chunks: Vec<String> = Vec::new();
    let mut on_chunk = |fragment: &str| chunks.push(fragment.to_string());
    let answer = client
        .chat(
            &[ChatMessage::user("list files")],
            ChatOptions::streaming(&mut on_chunk),
        )
        .await
        .unwrap();

    assert_eq!(answer, "ls -la");
    assert_eq!(chunks, vec!["ls".to_string(), " -la".to_string()]);
    assert_eq!(chunks.concat(), answer);
}

#[tokio::test]
async fn ollama_list_models_parses_tags() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(
            json!({"models": [{"name": "llama3.2"}, {"name": "codellama"}]}).to_string(),
        )
        .create_async()
        .await;

    let client = OllamaClient::new(local_config(server.url())).unwrap();
    let models = client.list_models().await.unwrap();
    assert_eq!(models, vec!["llama3.2".to_string(), "codellama".to_string()]);
}

#[tokio::test]
async fn ollama_health_check_reports_reachable_daemon() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_body(json!({"models": [{"name": "llama3.2"}]}).to_string())
        .create_async()
        .await;

    let client = OllamaClient::new(local_config(server.url())).unwrap();
    let health = client.health_check().await;
    assert!(health.healthy);
    assert_eq!(health.models, Some(vec!["llama3.2".to_string()]));
    assert!(health.error.is_none());
    assert!(health.response_time_ms.is_some());
}

#[tokio::test]
async fn ollama_reply_past_the_budget_is_a_timeout() {
    use std::io::Write;

    let mut server = mockito::Server::new_async().await;
    // Headers arrive promptly; the body stalls past the 100ms budget
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_chunked_body(|writer| {
            std::thread::sleep(std::time::Duration::from_millis(500));
            writer.write_all(
                br#"{"message":{"role":"assistant","content":"late"},"done":true}"#,
            )
        })
        .create_async()
        .await;

    let config = ProviderConfig::Local {
        host_url: server.url(),
        model: "llama3.2".to_string(),
        timeout_ms: 100,
    };
    let client = OllamaClient::new(config).unwrap();
    let err = client
        .chat(&[ChatMessage::user("hi")], ChatOptions::buffered())
        .await
        .unwrap_err();

    assert!(
        matches!(err, ProviderError::Timeout { ms: 100 }),
        "expected Timeout, got {err:?}"
    );
}

#[tokio::test]
async fn ollama_health_check_never_errors_on_unreachable_host() {
    // Nothing listens on the discard port
    let client = OllamaClient::new(local_config("http://127.0.0.1:9".to_string())).unwrap();
    let health = client.health_check().await;
    assert!(!health.healthy);
    assert!(!health.error.as_deref().unwrap_or_default().is_empty());
}

// OpenAI

#[tokio::test]
async fn openai_chat_sends_bearer_auth_and_json_mode() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "model": "gpt-4o-mini",
            "response_format": {"type": "json_object"},
            "messages": [{"role": "user", "content": "list files"}],
        })))
        .with_status(200)
        .with_body(
            json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"command\":\"ls\"}"}}],
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = OpenAiClient::new(openai_config(server.url()), "test-key".to_string()).unwrap();
    let answer = client
        .chat(
            &[ChatMessage::user("list files")],
            ChatOptions::buffered().json_only(),
        )
        .await
        .unwrap();

    assert_eq!(answer, r#"{"command":"ls"}"#);
    mock.assert_async().await;
}

#[tokio::test]
async fn openai_streaming_concatenates_sse_deltas() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "data: {\"choices\":[{\"delta\":{\"content\":\"du -sh\"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\" *\"}}]}\n",
        "\n",
        "data: [DONE]\n",
    );
    server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let client = OpenAiClient::new(openai_config(server.url()), "test-key".to_string()).unwrap();
    let mut chunks: Vec<String> = Vec::new();
    let mut on_chunk = |fragment: &str| chunks.push(fragment.to_string());
    let answer = client
        .chat(
            &[ChatMessage::user("disk usage")],
            ChatOptions::streaming(&mut on_chunk),
        )
        .await
        .unwrap();

    assert_eq!(answer, "du -sh *");
    assert_eq!(chunks.concat(), answer);
}

#[tokio::test]
async fn openai_non_success_maps_to_transport_with_status() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "bad key"}}"#)
        .create_async()
        .await;

    let client = OpenAiClient::new(openai_config(server.url()), "test-key".to_string()).unwrap();
    let err = client
        .chat(&[ChatMessage::user("hi")], ChatOptions::buffered())
        .await
        .unwrap_err();

    match err {
        ProviderError::Transport { status, message } => {
            assert_eq!(status, Some(401));
            assert!(message.contains("bad key"));
        }
        other => panic!("expected Transport, got {other:?}"),
    }
}

#[tokio::test]
async fn openai_list_models_parses_data_array() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/models")
        .match_header("authorization", "Bearer test-key")
        .with_status(200)
        .with_body(json!({"data": [{"id": "gpt-4o-mini"}, {"id": "gpt-4o"}]}).to_string())
        .create_async()
        .await;

    let client = OpenAiClient::new(openai_config(server.url()), "test-key".to_string()).unwrap();
    let models = client.list_models().await.unwrap();
    assert_eq!(models, vec!["gpt-4o-mini".to_string(), "gpt-4o".to_string()]);
}

// Anthropic

#[tokio::test]
async fn anthropic_extracts_system_into_top_level_field() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(json!({
            "system": "You answer with shell commands.",
            "messages": [
                {"role": "user", "content": "list files"},
                {"role": "assistant", "content": "ls"},
                {"role": "user", "content": "hidden ones too"},
            ],
        })))
        .with_status(200)
        .with_body(
            json!({"content": [{"type": "text", "text": "ls -la"}]}).to_string(),
        )
        .create_async()
        .await;

    let config = ProviderConfig::Anthropic {
        model: "claude-sonnet-4-20250514".to_string(),
        timeout_ms: 10_000,
    };
    let client = AnthropicClient::new(config, "test-key".to_string())
        .unwrap()
        .with_base_url(server.url());

    let history = vec![
        ChatMessage::system("You answer with shell commands."),
        ChatMessage::user("list files"),
        ChatMessage::assistant("ls"),
        ChatMessage::user("hidden ones too"),
    ];
    let answer = client.chat(&history, ChatOptions::buffered()).await.unwrap();

    assert_eq!(answer, "ls -la");
    mock.assert_async().await;
}

#[tokio::test]
async fn anthropic_streaming_collects_text_deltas() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"tar\"}}\n",
        "\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\" -xzf\"}}\n",
        "\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n",
        "\n",
    );
    server
        .mock("POST", "/v1/messages")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;

    let config = ProviderConfig::Anthropic {
        model: "claude-sonnet-4-20250514".to_string(),
        timeout_ms: 10_000,
    };
    let client = AnthropicClient::new(config, "test-key".to_string())
        .unwrap()
        .with_base_url(server.url());

    let mut chunks: Vec<String> = Vec::new();
    let mut on_chunk = |fragment: &str| chunks.push(fragment.to_string());
    let answer = client
        .chat(
            &[ChatMessage::user("extract archive")],
            ChatOptions::streaming(&mut on_chunk),
        )
        .await
        .unwrap();

    assert_eq!(answer, "tar -xzf");
    assert_eq!(chunks.concat(), answer);
}

#[tokio::test]
async fn anthropic_list_models_needs_no_network() {
    let config = ProviderConfig::Anthropic {
        model: "claude-sonnet-4-20250514".to_string(),
        timeout_ms: 10_000,
    };
    // No base_url override: a network call would hit the real API and fail
    let client = AnthropicClient::new(config, "test-key".to_string()).unwrap();
    let models = client.list_models().await.unwrap();
    assert!(models.contains(&"claude-sonnet-4-20250514".to_string()));
}

// OpenRouter

#[tokio::test]
async fn openrouter_sends_identification_headers_through_openai_transport() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer test-key")
        .match_header("http-referer", "https://example.com")
        .match_header("x-title", "cmdsage")
        .match_body(Matcher::PartialJson(json!({"model": "openai/gpt-4o-mini"})))
        .with_status(200)
        .with_body(
            json!({"choices": [{"message": {"role": "assistant", "content": "pwd"}}]})
                .to_string(),
        )
        .create_async()
        .await;

    let config = ProviderConfig::OpenRouter {
        model: "openai/gpt-4o-mini".to_string(),
        timeout_ms: 10_000,
        site_url: Some("https://example.com".to_string()),
        app_name: Some("cmdsage".to_string()),
    };
    let client = OpenRouterClient::new(config, "test-key".to_string())
        .unwrap()
        .with_base_url(server.url());

    let answer = client
        .chat(&[ChatMessage::user("where am I")], ChatOptions::buffered())
        .await
        .unwrap();

    assert_eq!(answer, "pwd");
    mock.assert_async().await;
}
