/** \brief DashScope OpenAI 兼容模式的 chat completions 地址。 */
pub const DEFAULT_ENDPOINT: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions";

/** \brief 固定默认模型。 */
pub const DEFAULT_MODEL: &str = "qwen-plus-1127";

/** \brief 覆盖 endpoint 的环境变量名。 */
pub const ENDPOINT_ENV: &str = "SMARTPASTE_ENDPOINT";

/**
 * \brief 单次补全调用的目标配置。
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionConfig {
    /** \brief POST 目标地址 */
    pub endpoint: String,
    /** \brief 请求体中的模型名 */
    pub model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl CompletionConfig {
    /**
     * \brief 读取默认值，允许用环境变量替换 endpoint（代理或本地桩服务）。
     */
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() {
                config.endpoint = endpoint.to_string();
            }
        }
        config
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_dashscope() {
        let config = CompletionConfig::default();
        assert_eq!(
            config.endpoint,
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
        assert_eq!(config.model, "qwen-plus-1127");
    }

    #[test]
    fn test_builders_override_fields() {
        let config = CompletionConfig::default()
            .with_endpoint("http://127.0.0.1:9/v1/chat/completions")
            .with_model("qwen-turbo");
        assert_eq!(config.endpoint, "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(config.model, "qwen-turbo");
    }
}
