//! Token persistence, the periodic refresh watcher and the login session.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, AuthUser, RegisterRequest, TokenPair};
use crate::storage::{KeyValueStore, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";

/// Tokens are treated as expired this long before their real expiry
pub const DEFAULT_EXPIRY_BUFFER: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no stored session")]
    NoSession,
}

/// Access/refresh tokens and their expiry, kept in a [`KeyValueStore`].
///
/// The expiry is stored as milliseconds since the Unix epoch.
#[derive(Clone)]
pub struct TokenStorage {
    store: Arc<dyn KeyValueStore>,
    expiry_buffer: Duration,
}

impl TokenStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
        }
    }

    /// A zero buffer compares the stored expiry against the clock directly
    pub fn with_expiry_buffer(mut self, buffer: Duration) -> Self {
        self.expiry_buffer = buffer;
        self
    }

    /// Persist a freshly issued pair; returns the computed expiry
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<DateTime<Utc>, StorageError> {
        self.store_tokens_at(tokens, Utc::now())
    }

    pub fn store_tokens_at(
        &self,
        tokens: &TokenPair,
        issued_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, StorageError> {
        let lifetime = chrono::Duration::seconds(tokens.expires_in.min(u32::MAX as u64) as i64);
        let expiry = issued_at + lifetime;
        self.store.set(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;
        self.store
            .set(TOKEN_EXPIRY_KEY, &expiry.timestamp_millis().to_string())?;
        debug!(%expiry, "Stored auth tokens");
        Ok(expiry)
    }

    pub fn access_token(&self) -> Result<Option<String>, StorageError> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StorageError> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// None when missing or unparsable
    pub fn expiry(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        let raw = self.store.get(TOKEN_EXPIRY_KEY)?;
        Ok(raw
            .and_then(|ms| ms.trim().parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()))
    }

    pub fn is_expired(&self) -> Result<bool, StorageError> {
        self.is_expired_at(Utc::now())
    }

    /// Expired once `now + buffer` reaches the stored expiry. No expiry means expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> Result<bool, StorageError> {
        let buffer = chrono::Duration::from_std(self.expiry_buffer)
            .unwrap_or_else(|_| chrono::Duration::zero());
        Ok(match self.expiry()? {
            Some(expiry) => now + buffer >= expiry,
            None => true,
        })
    }

    pub fn has_session(&self) -> Result<bool, StorageError> {
        Ok(self.refresh_token()?.is_some())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        self.store.remove(TOKEN_EXPIRY_KEY)
    }
}

/// Poll the stored expiry every `interval` and run `refresh` when it has passed.
///
/// The callback is awaited inside the polling loop, so two refreshes never run
/// at once; ticks missed while a refresh is in flight are skipped. Nothing
/// happens while no refresh token is stored.
pub fn spawn_refresh_watcher<F, Fut, E>(
    tokens: TokenStorage,
    interval: Duration,
    refresh: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; the first check is one interval out.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let due = match (tokens.has_session(), tokens.is_expired()) {
                (Ok(true), Ok(expired)) => expired,
                (Ok(false), _) => false,
                (Err(e), _) | (_, Err(e)) => {
                    warn!("Token storage unreadable: {}", e);
                    false
                }
            };
            if !due {
                continue;
            }

            debug!("Access token expired, refreshing");
            if let Err(e) = refresh().await {
                warn!("Token refresh failed: {}", e);
            }
        }
    })
}

/// Login state shared between the API client and the token store
#[derive(Clone)]
pub struct AuthSession {
    client: ApiClient,
    tokens: TokenStorage,
}

impl AuthSession {
    pub fn new(client: ApiClient, tokens: TokenStorage) -> Self {
        Self { client, tokens }
    }

    pub fn tokens(&self) -> &TokenStorage {
        &self.tokens
    }

    /// Reuse a stored, unexpired access token. Returns whether one was found.
    pub async fn restore(&self) -> Result<bool, AuthError> {
        if self.tokens.is_expired()? {
            return Ok(false);
        }
        match self.tokens.access_token()? {
            Some(token) => {
                self.client.set_access_token(Some(token)).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Option<AuthUser>, AuthError> {
        let response = self.client.login(email, password).await?;
        self.install(&response.tokens).await?;
        info!(email, "Logged in");
        Ok(response.user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<Option<AuthUser>, AuthError> {
        let response = self.client.register(request).await?;
        self.install(&response.tokens).await?;
        info!(email = %request.email, "Registered account");
        Ok(response.user)
    }

    /// Exchange the stored refresh token for a new pair.
    /// A rejected refresh token ends the session.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let refresh_token = self.tokens.refresh_token()?.ok_or(AuthError::NoSession)?;
        match self.client.refresh_tokens(&refresh_token).await {
            Ok(tokens) => {
                self.install(&tokens).await?;
                debug!("Refreshed access token");
                Ok(())
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Refresh token rejected, clearing session");
                self.clear_local().await?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Server-side logout is best effort; local state is always cleared.
    pub async fn logout(&self) -> Result<(), AuthError> {
        if let Some(refresh_token) = self.tokens.refresh_token()? {
            if let Err(e) = self.client.logout(&refresh_token).await {
                warn!("Server logout failed: {}", e);
            }
        }
        self.clear_local().await?;
        info!("Logged out");
        Ok(())
    }

    pub async fn current_user(&self) -> Result<AuthUser, AuthError> {
        Ok(self.client.current_user().await?)
    }

    /// Start the background refresh loop for this session
    pub fn watch(&self, interval: Duration) -> JoinHandle<()> {
        let session = self.clone();
        spawn_refresh_watcher(self.tokens.clone(), interval, move || {
            let session = session.clone();
            async move { session.refresh().await }
        })
    }

    async fn install(&self, tokens: &TokenPair) -> Result<(), AuthError> {
        self.tokens.store_tokens(tokens)?;
        self.client
            .set_access_token(Some(tokens.access_token.clone()))
            .await;
        Ok(())
    }

    async fn clear_local(&self) -> Result<(), AuthError> {
        self.tokens.clear()?;
        self.client.set_access_token(None).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn pair(expires_in: u64) -> TokenPair {
        TokenPair {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_in,
            token_type: "Bearer".into(),
        }
    }

    fn storage() -> TokenStorage {
        TokenStorage::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn stores_expiry_as_epoch_millis() {
        let tokens = storage();
        let issued = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let expiry = tokens.store_tokens_at(&pair(3600), issued).unwrap();

        assert_eq!(expiry, issued + chrono::Duration::hours(1));
        assert_eq!(tokens.expiry().unwrap(), Some(expiry));
        assert_eq!(tokens.access_token().unwrap().as_deref(), Some("access"));
    }

    #[test]
    fn buffer_moves_expiry_earlier() {
        let issued = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let four_minutes_left = issued + chrono::Duration::seconds(3600 - 240);

        let buffered = storage();
        buffered.store_tokens_at(&pair(3600), issued).unwrap();
        assert!(buffered.is_expired_at(four_minutes_left).unwrap());

        let exact = storage().with_expiry_buffer(Duration::ZERO);
        exact.store_tokens_at(&pair(3600), issued).unwrap();
        assert!(!exact.is_expired_at(four_minutes_left).unwrap());
        assert!(exact
            .is_expired_at(issued + chrono::Duration::seconds(3600))
            .unwrap());
    }

    #[test]
    fn missing_or_garbled_expiry_counts_as_expired() {
        let store = Arc::new(MemoryStore::new());
        let tokens = TokenStorage::new(store.clone());
        assert!(tokens.is_expired().unwrap());

        store.set(TOKEN_EXPIRY_KEY, "tomorrow").unwrap();
        assert!(tokens.is_expired().unwrap());
    }

    #[test]
    fn clear_removes_everything() {
        let tokens = storage();
        tokens.store_tokens(&pair(60)).unwrap();
        tokens.clear().unwrap();
        assert!(!tokens.has_session().unwrap());
        assert_eq!(tokens.access_token().unwrap(), None);
        assert_eq!(tokens.expiry().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_refreshes_expired_tokens_each_interval() {
        let tokens = storage();
        tokens.store_tokens(&pair(0)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = calls.clone();
        let handle = spawn_refresh_watcher(tokens, Duration::from_secs(60), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), AuthError>(())
            }
        });

        tokio::time::sleep(Duration::from_secs(185)).await;
        handle.abort();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn watcher_ignores_valid_tokens_and_missing_sessions() {
        let valid = storage();
        valid.store_tokens(&pair(3600)).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for tokens in [valid, storage()] {
            let counter = calls.clone();
            handles.push(spawn_refresh_watcher(tokens, Duration::from_secs(60), move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<(), AuthError>(())
                }
            }));
        }

        tokio::time::sleep(Duration::from_secs(300)).await;
        handles.iter().for_each(JoinHandle::abort);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_refreshes_never_overlap() {
        let tokens = storage();
        tokens.store_tokens(&pair(0)).unwrap();
        let started = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let (s, f, m) = (started.clone(), in_flight.clone(), max_in_flight.clone());
        let handle = spawn_refresh_watcher(tokens, Duration::from_secs(60), move || {
            let (s, f, m) = (s.clone(), f.clone(), m.clone());
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                let now = f.fetch_add(1, Ordering::SeqCst) + 1;
                m.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(150)).await;
                f.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), AuthError>(())
            }
        });

        tokio::time::sleep(Duration::from_secs(185)).await;
        handle.abort();
        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
    }
}
