use std::sync::RwLock;

use crate::secrets::{load_credential, SecretStore};

/**
 * \brief 持有当前 API Key 的实例级容器。
 * \details 只在内存中覆盖，不回写密钥库；读写各自加锁，一次请求只读取一次快照。
 */
#[derive(Debug, Default)]
pub struct CredentialManager {
    key: RwLock<String>,
}

impl CredentialManager {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: RwLock::new(key.into()),
        }
    }

    /**
     * \brief 从密钥库初始化；失败时退化为空凭据。
     */
    pub fn load_from(store: &dyn SecretStore) -> Self {
        Self::new(load_credential(store))
    }

    /** \brief 当前凭据非空即视为 AI 可用，每次实时计算。 */
    pub fn is_enabled(&self) -> bool {
        !self.get().is_empty()
    }

    pub fn get(&self) -> String {
        match self.key.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /** \brief 无条件替换，包括空串（即禁用）。 */
    pub fn set(&self, value: impl Into<String>) {
        let value = value.into();
        match self.key.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{MemorySecretStore, DASHSCOPE_ACCOUNT, DASHSCOPE_SERVICE_ID};

    #[test]
    fn test_enabled_tracks_every_set() {
        let creds = CredentialManager::default();
        assert!(!creds.is_enabled());

        for (value, enabled) in [("sk-a", true), ("", false), ("sk-b", true), (" ", true), ("", false)] {
            creds.set(value);
            assert_eq!(creds.is_enabled(), enabled, "after set({:?})", value);
            assert_eq!(creds.get(), value);
        }
    }

    #[test]
    fn test_override_does_not_touch_store() {
        let store = MemorySecretStore::with_secret(DASHSCOPE_SERVICE_ID, DASHSCOPE_ACCOUNT, "sk-vault");
        let creds = CredentialManager::load_from(&store);
        assert_eq!(creds.get(), "sk-vault");

        creds.set("sk-override");
        assert_eq!(creds.get(), "sk-override");
        let stored = store
            .retrieve(DASHSCOPE_SERVICE_ID, DASHSCOPE_ACCOUNT)
            .expect("retrieve");
        assert_eq!(stored.as_deref(), Some("sk-vault"));
    }

    #[test]
    fn test_load_from_empty_store_is_disabled() {
        let creds = CredentialManager::load_from(&MemorySecretStore::default());
        assert!(!creds.is_enabled());
        assert_eq!(creds.get(), "");
    }
}
