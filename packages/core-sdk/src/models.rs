use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

/** \brief 成功状态码，与 HTTP 200 对齐。 */
pub const STATUS_OK: i32 = 200;

/** \brief 调用失败的哨兵状态码，不与任何 HTTP 状态冲突。 */
pub const STATUS_FAILED: i32 = -1;

/**
 * \brief 消息结构，与 OpenAI Chat 消息格式对齐。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /** \brief 角色：system/user */
    pub role: String,
    /** \brief 内容 */
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/**
 * \brief 单轮 chat completion 请求体。
 */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
}

impl ChatRequest {
    /**
     * \brief 固定两条消息：先 system，后 user。
     */
    pub fn single_turn(model: &str, system: &str, user: &str) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![Message::system(system), Message::user(user)],
        }
    }
}

/**
 * \brief 宽松解析的响应体；缺失字段保持为 None，由调用方决定是否视为协议错误。
 */
#[derive(Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/**
 * \brief OpenAI 兼容的 token 用量，DashScope 兼容模式会返回。
 */
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
}

impl ChatResponse {
    /**
     * \brief 取 `choices[0].message.content`。
     * \details choices 缺失/为空或首项无 message 视为畸形响应；content 为 null 时返回空串。
     */
    pub fn first_content(&self) -> Result<String, CompletionError> {
        let choice = self
            .choices
            .as_ref()
            .ok_or_else(|| CompletionError::malformed("missing `choices`"))?
            .first()
            .ok_or_else(|| CompletionError::malformed("`choices` is empty"))?;
        let message = choice
            .message
            .as_ref()
            .ok_or_else(|| CompletionError::malformed("missing `choices[0].message`"))?;
        Ok(message.content.clone().unwrap_or_default())
    }
}

/**
 * \brief 返回给宿主的结果：失败时 text 为 None，成功时 text 必然存在（可能为空串）。
 */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub text: Option<String>,
    pub status: i32,
}

impl CompletionResult {
    pub fn completed(text: String) -> Self {
        Self {
            text: Some(text),
            status: STATUS_OK,
        }
    }

    pub fn failed() -> Self {
        Self {
            text: None,
            status: STATUS_FAILED,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }
}
