use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};

use crate::{
    config::CompletionConfig,
    credentials::CredentialManager,
    error::CompletionError,
    models::{ChatRequest, ChatResponse, CompletionResult, Usage},
    secrets::{KeyringSecretStore, SecretStore},
    telemetry::{TelemetryEvent, TelemetrySink},
};

/** \brief 固定的 system 指令。 */
pub const SYSTEM_INSTRUCTIONS: &str = "You are tasked with reformatting user's clipboard data. Use the user's instructions, and the content of their clipboard below to edit their clipboard content as they have requested it.

Do not output anything else besides the reformatted clipboard content.";

/**
 * \brief 拼接 user 消息；两段输入原样插入，不做转义。
 */
pub fn build_user_message(instructions: &str, clipboard: &str) -> String {
    format!(
        "User instructions:\n{}\n\nClipboard Content:\n{}\n\nOutput:\n",
        instructions, clipboard
    )
}

/**
 * \brief 传输层返回的原始 HTTP 结果。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /** \brief 状态码对应的原因短语，如 "Too Many Requests" */
    pub reason: String,
    /** \brief 仅在 2xx 时读取 */
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /** \brief 非 2xx 时替代补全内容的文本；无原因短语时省略分隔符。 */
    pub fn error_text(&self) -> String {
        if self.reason.is_empty() {
            format!("Error: {}", self.status)
        } else {
            format!("Error: {} - {}", self.status, self.reason)
        }
    }
}

/**
 * \brief 发送已序列化的 JSON 请求体。
 */
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn post_json(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: String,
    ) -> Result<HttpReply, CompletionError>;
}

/**
 * \brief 基于 reqwest 的传输实现；每次调用新建 client，随调用结束释放连接。
 */
#[derive(Debug, Default, Clone, Copy)]
pub struct ReqwestTransport;

#[async_trait]
impl ChatTransport for ReqwestTransport {
    async fn post_json(
        &self,
        endpoint: &str,
        api_key: &str,
        payload: String,
    ) -> Result<HttpReply, CompletionError> {
        let client = reqwest::Client::builder().build()?;
        let resp = client
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?;

        let status = resp.status();
        let reason = reason_phrase(&resp);
        let body = if status.is_success() {
            resp.text().await?
        } else {
            String::new()
        };
        Ok(HttpReply {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/**
 * \brief 服务端实际发送的原因短语；hyper 只在它与标准短语不同时保留，缺省回退到标准短语。
 */
fn reason_phrase(resp: &reqwest::Response) -> String {
    match resp.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
        None => resp
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    }
}

#[derive(Debug)]
struct Completion {
    text: String,
    usage: Option<Usage>,
}

/**
 * \brief 剪贴板 AI 格式化客户端：持有凭据，每次调用恰好一次网络往返。
 */
pub struct CompletionClient {
    config: CompletionConfig,
    credentials: CredentialManager,
    transport: Arc<dyn ChatTransport>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl CompletionClient {
    /**
     * \brief 构造时从密钥库读取一次凭据。
     */
    pub fn new(
        config: CompletionConfig,
        store: &dyn SecretStore,
        transport: Arc<dyn ChatTransport>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self::with_credentials(
            config,
            CredentialManager::load_from(store),
            transport,
            telemetry,
        )
    }

    pub fn with_credentials(
        config: CompletionConfig,
        credentials: CredentialManager,
        transport: Arc<dyn ChatTransport>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config,
            credentials,
            transport,
            telemetry,
        }
    }

    /**
     * \brief 系统密钥库 + reqwest 的默认组合。
     */
    pub fn with_defaults(telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self::new(
            CompletionConfig::from_env(),
            &KeyringSecretStore,
            Arc::new(ReqwestTransport),
            telemetry,
        )
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_enabled()
    }

    pub fn get_credential(&self) -> String {
        self.credentials.get()
    }

    /** \brief 仅覆盖内存中的凭据，不写回密钥库。 */
    pub fn set_credential(&self, value: impl Into<String>) {
        self.credentials.set(value);
    }

    /**
     * \brief 按用户指令改写剪贴板内容。
     * \details 任何内部错误都会被记录并转换为失败结果；非 2xx 响应以 "Error: ..." 文本返回且状态为成功。
     */
    pub async fn format_with_instructions(
        &self,
        instructions: &str,
        input: &str,
    ) -> CompletionResult {
        let user_message = build_user_message(instructions, input);

        match self.get_completion(SYSTEM_INSTRUCTIONS, &user_message).await {
            Ok(completion) => {
                let usage = completion.usage.unwrap_or_default();
                self.telemetry
                    .write_event(TelemetryEvent::CustomFormatGenerated {
                        prompt_tokens: usage.prompt_tokens,
                        completion_tokens: usage.completion_tokens,
                        model: self.config.model.clone(),
                    });
                CompletionResult::completed(completion.text)
            }
            Err(err) => {
                tracing::error!(error = %err, "chat completion failed");
                self.telemetry.write_event(TelemetryEvent::CustomFormatFailed {
                    error: err.to_string(),
                });
                CompletionResult::failed()
            }
        }
    }

    async fn get_completion(
        &self,
        system: &str,
        user: &str,
    ) -> Result<Completion, CompletionError> {
        let request = ChatRequest::single_turn(&self.config.model, system, user);
        let payload = serde_json::to_string(&request).map_err(CompletionError::Encode)?;
        let api_key = self.credentials.get();

        let reply = self
            .transport
            .post_json(&self.config.endpoint, &api_key, payload)
            .await?;

        if !reply.is_success() {
            return Ok(Completion {
                text: reply.error_text(),
                usage: None,
            });
        }

        let response: ChatResponse =
            serde_json::from_str(&reply.body).map_err(CompletionError::Decode)?;
        let text = response.first_content()?;
        Ok(Completion {
            text,
            usage: response.usage,
        })
    }
}
