//! Service credentials and where they are kept between runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

const CREDENTIALS_KEY: &[u8] = b"credentials";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("database error: {0}")]
    DbError(#[from] sled::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("both an endpoint and an API key are required")]
    Incomplete,
    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Endpoint and subscription key for the language service
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub endpoint: String,
    pub api_key: String,
}

impl Credentials {
    /// Trim both values and drop any trailing slash from the endpoint
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, CredentialError> {
        let endpoint = endpoint.trim().trim_end_matches('/');
        let api_key = api_key.trim();
        if endpoint.is_empty() || api_key.is_empty() {
            return Err(CredentialError::Incomplete);
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// The key with all but the last four characters hidden
    pub fn masked_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        let visible = chars.len().saturating_sub(4);
        chars
            .iter()
            .enumerate()
            .map(|(i, c)| if i < visible { '*' } else { *c })
            .collect()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.masked_key())
            .finish()
    }
}

/// Persists and retrieves one credential pair
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Result<Option<Credentials>, CredentialError>;
    fn set(&self, credentials: &Credentials) -> Result<(), CredentialError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredentials {
    saved_at: DateTime<Utc>,
    credentials: Credentials,
}

/// Sled-backed credential store.
pub struct SledCredentialStore {
    db: sled::Db,
}

impl SledCredentialStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CredentialError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// When the stored credentials were last written
    pub fn saved_at(&self) -> Result<Option<DateTime<Utc>>, CredentialError> {
        Ok(self.load()?.map(|stored| stored.saved_at))
    }

    fn load(&self) -> Result<Option<StoredCredentials>, CredentialError> {
        match self.db.get(CREDENTIALS_KEY)? {
            Some(data) => Ok(Some(serde_json::from_slice(&data)?)),
            None => Ok(None),
        }
    }
}

impl CredentialStore for SledCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, CredentialError> {
        Ok(self.load()?.map(|stored| stored.credentials))
    }

    fn set(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let stored = StoredCredentials {
            saved_at: Utc::now(),
            credentials: credentials.clone(),
        };
        let value = serde_json::to_vec(&stored)?;
        self.db.insert(CREDENTIALS_KEY, value)?;
        self.db.flush()?;
        Ok(())
    }
}

/// Credential store that lives only as long as the process
#[derive(Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(credentials: Credentials) -> Self {
        Self {
            inner: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<Credentials>, CredentialError> {
        let guard = self.inner.lock().map_err(|_| CredentialError::Poisoned)?;
        Ok(guard.clone())
    }

    fn set(&self, credentials: &Credentials) -> Result<(), CredentialError> {
        let mut guard = self.inner.lock().map_err(|_| CredentialError::Poisoned)?;
        *guard = Some(credentials.clone());
        Ok(())
    }
}
