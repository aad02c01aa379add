use crate::errors::{AppError, AppResult};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const KEYRING_SERVICE: &str = "lead-manager";
pub const API_KEY_ENTRY: &str = "print-api-key";
pub const API_KEY_ENV: &str = "LEAD_MANAGER_PRINT_API_KEY";

/// A single named secret slot.
pub trait SecretBackend: Send + Sync {
    fn get(&self) -> AppResult<Option<String>>;
    fn set(&self, value: &str) -> AppResult<()>;
    fn delete(&self) -> AppResult<()>;
}

/// OS keyring slot. A fresh `Entry` per call, so reads always see what the
/// platform store actually holds.
#[derive(Debug, Clone)]
pub struct KeyringSecret {
    service: String,
    user: String,
}

impl KeyringSecret {
    pub fn new(service: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            user: user.into(),
        }
    }

    fn entry(&self) -> AppResult<keyring::Entry> {
        keyring::Entry::new(&self.service, &self.user).map_err(|error| AppError::Io(error.to_string()))
    }
}

impl SecretBackend for KeyringSecret {
    fn get(&self) -> AppResult<Option<String>> {
        match self.entry()?.get_password() {
            Ok(value) if !value.is_empty() => Ok(Some(value)),
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }

    fn set(&self, value: &str) -> AppResult<()> {
        self.entry()?
            .set_password(value)
            .map_err(|error| AppError::Io(error.to_string()))
    }

    fn delete(&self) -> AppResult<()> {
        match self.entry()?.delete_credential() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AppError::Io(error.to_string())),
        }
    }
}

/// Printer API key storage. The secret backend is authoritative; the
/// environment variable is the fallback for headless setups without a
/// secret service.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn SecretBackend>,
    keyring_lock: Arc<Mutex<()>>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::with_backend(Arc::new(KeyringSecret::new(KEYRING_SERVICE, API_KEY_ENTRY)))
    }
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(backend: Arc<dyn SecretBackend>) -> Self {
        Self {
            backend,
            keyring_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Stores the key and reads it back. A store that accepts the write but
    /// does not retain it is an error.
    pub async fn save_api_key(&self, api_key: &str) -> AppResult<()> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AppError::Validation("API key cannot be empty".to_string()));
        }
        let _guard = self.keyring_lock.lock().await;
        self.backend.set(api_key)?;
        if self.backend.get()?.as_deref() != Some(api_key) {
            tracing::error!("credential store did not retain the printer api key");
            return Err(AppError::Io("credential store did not retain the API key".to_string()));
        }
        tracing::info!("printer api key stored");
        Ok(())
    }

    pub async fn clear_api_key(&self) -> AppResult<()> {
        let _guard = self.keyring_lock.lock().await;
        self.backend.delete()
    }

    pub async fn has_api_key(&self) -> bool {
        matches!(self.resolve_api_key().await, Ok(Some(_)))
    }

    pub async fn resolve_api_key(&self) -> AppResult<Option<String>> {
        let stored = {
            let _guard = self.keyring_lock.lock().await;
            match self.backend.get() {
                Ok(value) => value,
                Err(error) => {
                    tracing::warn!(error = %error, "keyring unavailable, falling back to environment");
                    None
                }
            }
        };
        Ok(stored.or_else(|| api_key_from_env(std::env::var(API_KEY_ENV).ok())))
    }
}

fn api_key_from_env(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
