use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{llm::CompletionClient, models::CompletionResult};

/**
 * \brief 启动本地 HTTP 服务，供非 Rust 宿主调用格式化能力。
 * \param addr 监听地址，如 "127.0.0.1:5174"
 */
pub async fn run(addr: &str, client: Arc<CompletionClient>) -> Result<()> {
    let app = router(client);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/**
 * \brief 构建路由，便于嵌入其他服务或测试。
 */
pub fn router(client: Arc<CompletionClient>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/status", get(get_status))
        .route("/api/credential", put(set_credential))
        .route("/api/format", post(format_text))
        .with_state(client)
}

#[derive(Serialize, Deserialize, Debug)]
struct StatusResponse {
    /** \brief 是否已配置 API Key */
    enabled: bool,
    /** \brief 使用的模型名 */
    model: String,
}

#[derive(Deserialize, Debug)]
struct CredentialRequest {
    /** \brief 新的 API Key；空串表示禁用。 */
    api_key: String,
}

#[derive(Deserialize, Debug)]
struct FormatRequest {
    /** \brief 用户指令 */
    instructions: String,
    /** \brief 剪贴板内容 */
    input: String,
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn get_status(State(client): State<Arc<CompletionClient>>) -> Json<StatusResponse> {
    Json(status_of(&client))
}

async fn set_credential(
    State(client): State<Arc<CompletionClient>>,
    Json(req): Json<CredentialRequest>,
) -> Json<StatusResponse> {
    client.set_credential(req.api_key);
    Json(status_of(&client))
}

async fn format_text(
    State(client): State<Arc<CompletionClient>>,
    Json(req): Json<FormatRequest>,
) -> Json<CompletionResult> {
    Json(
        client
            .format_with_instructions(&req.instructions, &req.input)
            .await,
    )
}

fn status_of(client: &CompletionClient) -> StatusResponse {
    StatusResponse {
        enabled: client.is_enabled(),
        model: client.config().model.clone(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        config::CompletionConfig,
        credentials::CredentialManager,
        error::CompletionError,
        llm::{ChatTransport, HttpReply},
        telemetry::NoopTelemetry,
    };

    struct EchoTransport;

    #[async_trait]
    impl ChatTransport for EchoTransport {
        async fn post_json(
            &self,
            _endpoint: &str,
            api_key: &str,
            _payload: String,
        ) -> Result<HttpReply, CompletionError> {
            if api_key.is_empty() {
                return Ok(HttpReply {
                    status: 401,
                    reason: "Unauthorized".to_string(),
                    body: String::new(),
                });
            }
            Ok(HttpReply {
                status: 200,
                reason: "OK".to_string(),
                body: json!({ "choices": [{ "message": { "content": api_key } }] }).to_string(),
            })
        }
    }

    async fn spawn_api(initial_key: &str) -> String {
        let client = Arc::new(CompletionClient::with_credentials(
            CompletionConfig::default(),
            CredentialManager::new(initial_key),
            Arc::new(EchoTransport),
            Arc::new(NoopTelemetry),
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind api");
        let addr = listener.local_addr().expect("api addr");
        tokio::spawn(async move {
            axum::serve(listener, router(client)).await.ok();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_status_and_credential_override() {
        let base = spawn_api("").await;
        let http = reqwest::Client::new();

        let status: Value = http
            .get(format!("{}/api/status", base))
            .send()
            .await
            .expect("status request")
            .json()
            .await
            .expect("status json");
        assert_eq!(status["enabled"], false);
        assert_eq!(status["model"], "qwen-plus-1127");

        let status: Value = http
            .put(format!("{}/api/credential", base))
            .json(&json!({ "api_key": "sk-server" }))
            .send()
            .await
            .expect("credential request")
            .json()
            .await
            .expect("credential json");
        assert_eq!(status["enabled"], true);
    }

    #[tokio::test]
    async fn test_format_endpoint_returns_result() {
        let base = spawn_api("sk-echo").await;
        let http = reqwest::Client::new();

        let result: CompletionResult = http
            .post(format!("{}/api/format", base))
            .json(&json!({ "instructions": "echo", "input": "anything" }))
            .send()
            .await
            .expect("format request")
            .json()
            .await
            .expect("format json");
        assert_eq!(result, CompletionResult::completed("sk-echo".to_string()));
    }

    #[tokio::test]
    async fn test_format_endpoint_surfaces_http_error_text() {
        let base = spawn_api("").await;
        let http = reqwest::Client::new();

        let result: CompletionResult = http
            .post(format!("{}/api/format", base))
            .json(&json!({ "instructions": "echo", "input": "anything" }))
            .send()
            .await
            .expect("format request")
            .json()
            .await
            .expect("format json");
        assert_eq!(result.text.as_deref(), Some("Error: 401 - Unauthorized"));
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_api("").await;
        let body: Value = reqwest::get(format!("{}/api/health", base))
            .await
            .expect("health request")
            .json()
            .await
            .expect("health json");
        assert_eq!(body, json!({ "ok": true }));
    }
}
