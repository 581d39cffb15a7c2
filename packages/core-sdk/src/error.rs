use thiserror::Error;

/**
 * \brief 一次补全调用内部可能出现的错误，均在调用边界被捕获。
 */
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Connection(String),

    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl CompletionError {
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

/**
 * \brief 密钥库访问错误。
 */
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret store unavailable: {0}")]
    Unavailable(String),

    #[error("secret store error: {0}")]
    Store(String),
}

impl From<keyring::Error> for SecretError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(e) | keyring::Error::NoStorageAccess(e) => {
                Self::Unavailable(e.to_string())
            }
            other => Self::Store(other.to_string()),
        }
    }
}
