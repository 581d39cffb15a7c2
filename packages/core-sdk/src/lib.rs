pub mod config;
pub mod credentials;
pub mod error;
pub mod llm;
pub mod models;
pub mod secrets;
pub mod server;
pub mod telemetry;

pub use llm::CompletionClient;
pub use models::{CompletionResult, STATUS_FAILED, STATUS_OK};

/**
 * \brief SDK 预导入集合，方便外部引用常用模块。
 */
pub mod prelude {
    pub use crate::config;
    pub use crate::credentials;
    pub use crate::error;
    pub use crate::llm;
    pub use crate::models;
    pub use crate::secrets;
    pub use crate::server;
    pub use crate::telemetry;
}
