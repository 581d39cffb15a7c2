use std::collections::HashMap;
use std::sync::RwLock;

use keyring::Entry;

use crate::error::SecretError;

/** \brief 密钥库中的服务标识。 */
pub const DASHSCOPE_SERVICE_ID: &str = "https://dashscope.aliyuncs.com/api-keys";

/** \brief 密钥库中的账户名。 */
pub const DASHSCOPE_ACCOUNT: &str = "PowerToys_AdvancedPaste_DashScopeKey";

/**
 * \brief 平台密钥库抽象，按 (service, account) 寻址。
 */
pub trait SecretStore: Send + Sync {
    /** \brief 读取密钥；条目不存在时返回 Ok(None)。 */
    fn retrieve(&self, service: &str, account: &str) -> Result<Option<String>, SecretError>;

    fn store(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError>;

    /** \brief 删除条目；不存在时视为成功。 */
    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError>;
}

/**
 * \brief 基于操作系统 keyring 的实现（Windows Credential Manager / macOS Keychain / Secret Service）。
 */
#[derive(Debug, Default)]
pub struct KeyringSecretStore;

impl SecretStore for KeyringSecretStore {
    fn retrieve(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        let entry = Entry::new(service, account)?;
        match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError> {
        let entry = Entry::new(service, account)?;
        entry.set_password(secret).map_err(SecretError::from)
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError> {
        let entry = Entry::new(service, account)?;
        match entry.delete_password() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/**
 * \brief 进程内密钥库，用于测试或无系统密钥库的环境。
 */
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<(String, String), String>>,
}

impl MemorySecretStore {
    pub fn with_secret(service: &str, account: &str, secret: &str) -> Self {
        let store = Self::default();
        if let Ok(mut guard) = store.secrets.write() {
            guard.insert(
                (service.to_string(), account.to_string()),
                secret.to_string(),
            );
        }
        store
    }
}

impl SecretStore for MemorySecretStore {
    fn retrieve(&self, service: &str, account: &str) -> Result<Option<String>, SecretError> {
        let guard = self
            .secrets
            .read()
            .map_err(|e| SecretError::Store(e.to_string()))?;
        Ok(guard
            .get(&(service.to_string(), account.to_string()))
            .cloned())
    }

    fn store(&self, service: &str, account: &str, secret: &str) -> Result<(), SecretError> {
        let mut guard = self
            .secrets
            .write()
            .map_err(|e| SecretError::Store(e.to_string()))?;
        guard.insert(
            (service.to_string(), account.to_string()),
            secret.to_string(),
        );
        Ok(())
    }

    fn delete(&self, service: &str, account: &str) -> Result<(), SecretError> {
        let mut guard = self
            .secrets
            .write()
            .map_err(|e| SecretError::Store(e.to_string()))?;
        guard.remove(&(service.to_string(), account.to_string()));
        Ok(())
    }
}

/**
 * \brief 读取 DashScope API Key；无条目或密钥库出错时返回空串，从不向上抛错。
 */
pub fn load_credential(store: &dyn SecretStore) -> String {
    match store.retrieve(DASHSCOPE_SERVICE_ID, DASHSCOPE_ACCOUNT) {
        Ok(Some(secret)) => secret,
        Ok(None) => {
            tracing::debug!("no DashScope key in secret store");
            String::new()
        }
        Err(err) => {
            tracing::debug!(error = %err, "secret store lookup failed, AI formatting disabled");
            String::new()
        }
    }
}
