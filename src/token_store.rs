//! Token store: a short-lived bearer token in a keyed cache with expiry
//!
//! ## Layers
//!
//! - [`KeyValueCache`] - get/put/delete with TTL, implemented by
//!   [`MemoryCache`] (process-local) and [`FileCache`] (per-user JSON file)
//! - [`TokenCache`] - stores the token and its expiry under fixed keys
//! - [`CredentialProvider`] - what the fetch engine reads the token through
//!
//! Expiry is absolute from the time of storage; reads never extend it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, UpError};

/// Cache key of the bearer token
pub const TOKEN_KEY: &str = "token";

/// Cache key of the token's expiry timestamp (RFC 3339)
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";

/// Default token lifetime (1 day)
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60 * 24);

/// One cached value and the instant it stops being readable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: impl Into<String>, ttl: Duration) -> Result<Self> {
        Ok(Self {
            value: value.into(),
            expires_at: expiry_after(ttl)?,
        })
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

fn expiry_after(ttl: Duration) -> Result<DateTime<Utc>> {
    let ttl = chrono::Duration::from_std(ttl).map_err(|e| UpError::Cache {
        reason: format!("TTL out of range: {}", e),
    })?;
    Utc::now().checked_add_signed(ttl).ok_or_else(|| UpError::Cache {
        reason: "TTL overflows the calendar".to_string(),
    })
}

/// Keyed cache with per-entry TTL
pub trait KeyValueCache: Send + Sync {
    /// Live value for `key`; expired entries read as absent
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite `key`, readable for `ttl`
    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn get_all(&self, keys: &[&str]) -> Result<HashMap<String, String>> {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.insert((*key).to_string(), value);
            }
        }
        Ok(found)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock();
        let now = Utc::now();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, ttl)?;
        self.entries.lock().insert(key.to_string(), entry);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Per-user cache persisted as a JSON map of [`CacheEntry`]
///
/// Entries carry absolute expiry timestamps so separate processes agree on
/// when a token lapses. A missing file is an empty cache.
#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, CacheEntry>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| UpError::Cache {
            reason: format!("Failed to read {}: {}", self.path.display(), e),
        })?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let mut entries: HashMap<String, CacheEntry> =
            serde_json::from_str(&content).map_err(|e| UpError::Cache {
                reason: format!("Failed to parse {}: {}", self.path.display(), e),
            })?;
        let now = Utc::now();
        entries.retain(|_, entry| entry.is_live(now));
        Ok(entries)
    }

    fn save(&self, entries: &HashMap<String, CacheEntry>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| UpError::Cache {
                    reason: format!("Failed to create {}: {}", dir.display(), e),
                })?;
            }
        }

        let content = serde_json::to_string_pretty(entries).map_err(|e| UpError::Cache {
            reason: format!("Failed to serialize cache: {}", e),
        })?;
        fs::write(&self.path, content).map_err(|e| UpError::Cache {
            reason: format!("Failed to write {}: {}", self.path.display(), e),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }
}

impl KeyValueCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key).map(|entry| entry.value))
    }

    fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), CacheEntry::new(value, ttl)?);
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// Token and expiry as read back from the cache
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredToken {
    pub token: Option<String>,
    pub expiry: Option<String>,
}

/// The single credential slot
#[derive(Debug)]
pub struct TokenCache<C> {
    cache: C,
    ttl: Duration,
}

impl<C: KeyValueCache> TokenCache<C> {
    pub fn new(cache: C) -> Self {
        Self {
            cache,
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store with the configured TTL
    pub fn store(&self, token: &str) -> Result<DateTime<Utc>> {
        self.store_for(token, self.ttl)
    }

    /// Store `token` and `now + ttl` under the fixed keys, overwriting any
    /// previous token. Both entries expire together.
    pub fn store_for(&self, token: &str, ttl: Duration) -> Result<DateTime<Utc>> {
        let expiry = expiry_after(ttl)?;
        let expiry_text = expiry.to_rfc3339_opts(SecondsFormat::Millis, true);
        self.cache.put(TOKEN_KEY, token, ttl)?;
        self.cache.put(TOKEN_EXPIRY_KEY, &expiry_text, ttl)?;
        debug!(expires_at = %expiry_text, "Stored Up API token");
        Ok(expiry)
    }

    pub fn retrieve(&self) -> Result<StoredToken> {
        let mut found = self.cache.get_all(&[TOKEN_KEY, TOKEN_EXPIRY_KEY])?;
        Ok(StoredToken {
            token: found.remove(TOKEN_KEY),
            expiry: found.remove(TOKEN_EXPIRY_KEY),
        })
    }

    /// Delete both entries; returns whether a token was present
    pub fn expire(&self) -> Result<bool> {
        let had_token = self.cache.get(TOKEN_KEY)?.is_some();
        self.cache.remove_all(&[TOKEN_KEY, TOKEN_EXPIRY_KEY])?;
        debug!(had_token, "Expired Up API token");
        Ok(had_token)
    }
}

/// Source of the bearer token used by the fetch engine
pub trait CredentialProvider {
    fn token(&self) -> Result<Option<String>>;

    /// Expiry to display alongside the token, when known
    fn token_expiry(&self) -> Result<Option<String>> {
        Ok(None)
    }

    /// Use `self` when it has a token, else `fallback`
    fn or<B: CredentialProvider>(self, fallback: B) -> Fallback<Self, B>
    where
        Self: Sized,
    {
        Fallback {
            primary: self,
            fallback,
        }
    }
}

impl<C: KeyValueCache> CredentialProvider for TokenCache<C> {
    fn token(&self) -> Result<Option<String>> {
        Ok(self.retrieve()?.token)
    }

    fn token_expiry(&self) -> Result<Option<String>> {
        Ok(self.retrieve()?.expiry)
    }
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for &T {
    fn token(&self) -> Result<Option<String>> {
        (**self).token()
    }

    fn token_expiry(&self) -> Result<Option<String>> {
        (**self).token_expiry()
    }
}

/// Fixed token, mostly for tests and one-off calls
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(pub Option<String>);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialProvider for StaticCredential {
    fn token(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Token from an environment variable (`UP_API_TOKEN` by default)
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub const DEFAULT_VAR: &'static str = "UP_API_TOKEN";

    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VAR)
    }
}

impl CredentialProvider for EnvCredential {
    fn token(&self) -> Result<Option<String>> {
        Ok(std::env::var(&self.var).ok().filter(|t| !t.trim().is_empty()))
    }
}

/// See [`CredentialProvider::or`]
#[derive(Debug)]
pub struct Fallback<A, B> {
    primary: A,
    fallback: B,
}

impl<A: CredentialProvider, B: CredentialProvider> CredentialProvider for Fallback<A, B> {
    fn token(&self) -> Result<Option<String>> {
        match self.primary.token()? {
            Some(token) => Ok(Some(token)),
            None => self.fallback.token(),
        }
    }

    fn token_expiry(&self) -> Result<Option<String>> {
        if self.primary.token()?.is_some() {
            self.primary.token_expiry()
        } else {
            self.fallback.token_expiry()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn store_then_retrieve() {
        let cache = TokenCache::new(MemoryCache::new());

        let expiry = cache.store("up:yeah:secret").unwrap();
        let stored = cache.retrieve().unwrap();

        assert_eq!(stored.token.as_deref(), Some("up:yeah:secret"));
        assert_eq!(
            stored.expiry,
            Some(expiry.to_rfc3339_opts(SecondsFormat::Millis, true))
        );
        assert!(expiry > Utc::now() + chrono::Duration::hours(23));
    }

    #[test]
    fn store_overwrites_previous_token() {
        let cache = TokenCache::new(MemoryCache::new());
        cache.store("first").unwrap();
        cache.store("second").unwrap();
        assert_eq!(cache.token().unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn expire_reports_presence() {
        let cache = TokenCache::new(MemoryCache::new());
        assert!(!cache.expire().unwrap());

        cache.store("secret").unwrap();
        assert!(cache.expire().unwrap());
        assert_eq!(cache.retrieve().unwrap(), StoredToken::default());
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = TokenCache::new(MemoryCache::new());
        cache.store_for("secret", Duration::ZERO).unwrap();

        assert_eq!(cache.token().unwrap(), None);
        assert_eq!(cache.token_expiry().unwrap(), None);
    }

    #[test]
    fn file_cache_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("cache.json");

        TokenCache::new(FileCache::new(&path)).store("secret").unwrap();
        let reopened = TokenCache::new(FileCache::new(&path));

        assert_eq!(reopened.token().unwrap().as_deref(), Some("secret"));
        assert!(reopened.expire().unwrap());
        assert_eq!(
            TokenCache::new(FileCache::new(&path)).token().unwrap(),
            None
        );
    }

    #[test]
    fn file_cache_drops_expired_entries() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("cache.json"));

        cache.put("a", "1", Duration::ZERO).unwrap();
        cache.put("b", "2", Duration::from_secs(60)).unwrap();

        assert_eq!(cache.get("a").unwrap(), None);
        assert_eq!(cache.get("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn missing_file_is_empty_cache() {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::new(dir.path().join("absent.json"));
        assert_eq!(cache.get(TOKEN_KEY).unwrap(), None);
        cache.remove(TOKEN_KEY).unwrap();
        assert!(!cache.path().exists());
    }

    #[test]
    fn corrupt_file_is_a_cache_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();

        let err = FileCache::new(&path).get(TOKEN_KEY).unwrap_err();
        assert!(matches!(err, UpError::Cache { .. }));
    }

    #[test]
    fn fallback_prefers_primary() {
        let memory = TokenCache::new(MemoryCache::new());
        memory.store("cached").unwrap();

        let chained = StaticCredential::new("explicit").or(&memory);
        assert_eq!(chained.token().unwrap().as_deref(), Some("explicit"));
        assert_eq!(chained.token_expiry().unwrap(), None);

        let chained = StaticCredential::none().or(&memory);
        assert_eq!(chained.token().unwrap().as_deref(), Some("cached"));
        assert!(chained.token_expiry().unwrap().is_some());
    }
}
