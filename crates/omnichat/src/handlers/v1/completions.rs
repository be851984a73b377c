//! Completion HTTP handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::llm::{Adapter, Credential, Message, Provider, Role};
use crate::response;
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct CompletionRequest {
    provider: String,
    model: String,
    messages: Vec<Message>,
    #[serde(default)]
    api_key: Credential,
}

#[derive(Serialize)]
pub struct CompletionResponse {
    id: String,
    role: Role,
    content: String,
    provider: String,
    adapter: Adapter,
}

#[derive(Serialize)]
pub struct ProviderEntry {
    tag: String,
    adapter: Adapter,
}

#[derive(Serialize)]
pub struct ListProvidersResponse {
    providers: Vec<ProviderEntry>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/completions
pub async fn complete(
    State(state): State<AppState>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return response::bad_request(rejection.body_text()),
    };

    let content = match state
        .dispatcher
        .complete(&req.provider, &req.model, &req.messages, &req.api_key)
        .await
    {
        Ok(content) => content,
        Err(e) => return response::completion_error(&e),
    };

    let adapter = state
        .dispatcher
        .adapter_for(&Provider::parse(&req.provider))
        .adapter();

    let response = CompletionResponse {
        id: format!("msg_{}", Ulid::new()),
        role: Role::Assistant,
        content,
        provider: req.provider,
        adapter,
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// GET /api/v1/providers
///
/// Recognized tags first, then configured custom tags.
pub async fn list_providers(State(state): State<AppState>) -> Json<ListProvidersResponse> {
    let entry = |tag: &str| ProviderEntry {
        tag: tag.to_string(),
        adapter: state.dispatcher.adapter_for(&Provider::parse(tag)).adapter(),
    };

    let mut providers: Vec<ProviderEntry> = Provider::KNOWN.iter().copied().map(&entry).collect();
    providers.extend(state.dispatcher.custom_providers().map(&entry));

    Json(ListProvidersResponse { providers })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::config::{EndpointConfig, ProvidersConfig};
    use crate::llm::Dispatcher;
    use crate::server::build_app;

    fn app() -> Router {
        let mut config = ProvidersConfig::default();
        config.custom.insert(
            "local".to_string(),
            EndpointConfig {
                base_url: "http://127.0.0.1:9/v1".to_string(),
            },
        );
        let dispatcher = Dispatcher::new(reqwest::Client::new(), &config);
        build_app(
            AppState {
                dispatcher: Arc::new(dispatcher),
            },
            30,
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_completion(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/completions")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn mistral_returns_not_implemented() {
        let (status, body) = send(
            app(),
            post_completion(json!({
                "provider": "mistral",
                "model": "mistral-large-latest",
                "messages": [{"role": "user", "content": "hi"}],
                "api_key": "key"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["error"]["type"], "not_implemented");
        assert_eq!(body["error"]["provider"], "mistral");
        assert_eq!(body["error"]["adapter"], "mistral");
        assert!(body["error"].get("upstream_status").is_none());
    }

    #[tokio::test]
    async fn anthropic_without_user_turns_is_bad_request() {
        let (status, body) = send(
            app(),
            post_completion(json!({
                "provider": "anthropic",
                "model": "claude-3-5-haiku-latest",
                "messages": [{"role": "system", "content": "S"}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_conversation");
        assert_eq!(
            body["error"]["message"],
            "invalid conversation: no user messages found"
        );
    }

    #[tokio::test]
    async fn unreachable_vendor_is_bad_gateway() {
        let (status, body) = send(
            app(),
            post_completion(json!({
                "provider": "local",
                "model": "llama3",
                "messages": [{"role": "user", "content": "hi"}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "transport_error");
        assert_eq!(body["error"]["adapter"], "generic");
    }

    #[tokio::test]
    async fn malformed_body_is_bad_request() {
        let (status, body) = send(
            app(),
            post_completion(json!({
                "provider": "openai",
                "messages": [{"role": "narrator", "content": "hi"}]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "bad_request");
    }

    #[tokio::test]
    async fn providers_lists_known_and_custom_tags() {
        let request = Request::builder()
            .uri("/api/v1/providers")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        let providers = body["providers"].as_array().unwrap();
        assert_eq!(providers.len(), Provider::KNOWN.len() + 1);
        assert_eq!(providers[0], json!({"tag": "openai", "adapter": "openai"}));
        assert!(providers.contains(&json!({"tag": "llama", "adapter": "meta"})));
        assert_eq!(
            providers.last().unwrap(),
            &json!({"tag": "local", "adapter": "generic"})
        );
    }
}
