use anyhow::{anyhow, Result};
use std::sync::Mutex;

use crate::session::SessionStore;

/// Source of the bearer token attached to every order request.
///
/// Queried synchronously before each request; a missing or expired token is
/// only signalled by the server's 401.
pub trait CredentialProvider: Send + Sync {
    /// Load the current auth token
    fn load_token(&self) -> Result<Option<String>>;

    /// Store a new auth token
    fn store_token(&self, token: &str) -> Result<()>;

    /// Forget the stored auth token
    fn clear_token(&self) -> Result<()>;
}

/// File-backed credential store (`~/.errand/auth_token`)
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    session_store: SessionStore,
}

impl FileCredentialStore {
    /// Create a credential store at the default location
    pub fn new() -> Result<Self> {
        let session_store = SessionStore::new()?;
        Ok(Self { session_store })
    }

    pub fn with_store(session_store: SessionStore) -> Self {
        Self { session_store }
    }
}

impl CredentialProvider for FileCredentialStore {
    fn load_token(&self) -> Result<Option<String>> {
        self.session_store.load()
    }

    fn store_token(&self, token: &str) -> Result<()> {
        self.session_store.save(token)
    }

    fn clear_token(&self) -> Result<()> {
        self.session_store.delete()
    }
}

/// In-memory credentials, used for `--token` overrides and tests
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: Mutex<Option<String>>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn load_token(&self) -> Result<Option<String>> {
        let token = self
            .token
            .lock()
            .map_err(|_| anyhow!("credential lock poisoned"))?;
        Ok(token.clone())
    }

    fn store_token(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| anyhow!("credential lock poisoned"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_| anyhow!("credential lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_credential_store() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCredentialStore::with_store(SessionStore::at(temp_dir.path().join("auth_token")));

        assert_eq!(store.load_token().unwrap(), None);

        store.store_token("test-auth-token").unwrap();
        assert_eq!(store.load_token().unwrap(), Some("test-auth-token".to_string()));

        store.clear_token().unwrap();
        assert_eq!(store.load_token().unwrap(), None);
    }

    #[test]
    fn test_static_credentials() {
        let creds = StaticCredentials::empty();
        assert_eq!(creds.load_token().unwrap(), None);

        creds.store_token("abc").unwrap();
        assert_eq!(creds.load_token().unwrap(), Some("abc".to_string()));

        creds.clear_token().unwrap();
        assert_eq!(creds.load_token().unwrap(), None);

        let preset = StaticCredentials::new("preset");
        assert_eq!(preset.load_token().unwrap(), Some("preset".to_string()));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_file_store_round_trips_valid_tokens(token in "[a-zA-Z0-9_.-]{8,256}") {
            let temp_dir = TempDir::new().unwrap();
            let store = FileCredentialStore::with_store(SessionStore::at(temp_dir.path().join("auth_token")));

            store.store_token(&token).unwrap();
            prop_assert_eq!(store.load_token().unwrap(), Some(token.clone()));
        }
    }
}
