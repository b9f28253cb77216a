//! Session wrapper around an auth backend.
//!
//! [`ensure_profile`] is the fetch-or-create step run after every sign-in: the
//! profile row may lag behind the account, so it polls a few times with a
//! linear backoff before creating the row itself. [`SessionManager`] keeps the
//! current session and profile for a long-lived client and reacts to
//! sign-in/sign-out notifications.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{Account, Role};
use crate::db;
use crate::error::AppError;
use crate::models::{NewProfile, Profile};

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub account: Account,
    pub expires_at: NaiveDateTime,
}

#[rocket::async_trait]
pub trait AuthBackend: Send + Sync {
    /// `None` for unknown or expired tokens.
    async fn get_session(&self, token: &str) -> Result<Option<AuthSession>, AppError>;

    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, AppError>;

    /// Fails with `AppError::Conflict` when the row already exists.
    async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, AppError>;

    async fn sign_out(&self, token: &str) -> Result<(), AppError>;
}

pub struct SqliteAuthBackend {
    pool: Pool<Sqlite>,
}

impl SqliteAuthBackend {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[rocket::async_trait]
impl AuthBackend for SqliteAuthBackend {
    async fn get_session(&self, token: &str) -> Result<Option<AuthSession>, AppError> {
        let session = match db::get_session_by_token(&self.pool, token).await {
            Ok(session) => session,
            Err(AppError::Authentication(_)) => return Ok(None),
            Err(err) => return Err(err),
        };

        if !session.is_valid() {
            debug!(user_id = session.user_id, "Session token expired");
            return Ok(None);
        }

        let account = db::get_account(&self.pool, session.user_id).await?;

        Ok(Some(AuthSession {
            token: session.token,
            account,
            expires_at: session.expires_at,
        }))
    }

    async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, AppError> {
        db::find_profile(&self.pool, user_id).await
    }

    async fn create_profile(&self, profile: &NewProfile) -> Result<Profile, AppError> {
        db::create_profile(&self.pool, profile).await
    }

    async fn sign_out(&self, token: &str) -> Result<(), AppError> {
        db::invalidate_session(&self.pool, token).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Linear: the wait after attempt `n` is `n * base_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Fetches the profile row for `account`, creating it once polling gives up.
#[instrument(skip(backend, policy), fields(user_id = account.id))]
pub async fn ensure_profile<B>(
    backend: &B,
    account: &Account,
    policy: &RetryPolicy,
) -> Result<Profile, AppError>
where
    B: AuthBackend + ?Sized,
{
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        if let Some(profile) = backend.get_profile(account.id).await? {
            return Ok(profile);
        }

        if attempt < attempts {
            let delay = policy.delay_for(attempt);
            debug!(attempt, ?delay, "Profile not visible yet, retrying");
            tokio::time::sleep(delay).await;
        }
    }

    info!("No profile found, creating one");
    let new_profile = NewProfile {
        id: account.id,
        full_name: account.full_name.clone(),
        email: account.email.clone(),
        role: Role::User,
    };

    match backend.create_profile(&new_profile).await {
        Ok(profile) => Ok(profile),
        Err(AppError::Conflict(_)) => {
            warn!("Profile was created concurrently, fetching it");
            backend
                .get_profile(account.id)
                .await?
                .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))
        }
        Err(err) => Err(err),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<Account>,
    pub profile: Option<Profile>,
    pub is_authenticated: bool,
    pub is_admin: bool,
    pub is_super_admin: bool,
    pub loading: bool,
}

impl SessionSnapshot {
    pub fn signed_in(account: Account, profile: Profile) -> Self {
        Self {
            is_authenticated: true,
            is_admin: profile.role.is_admin(),
            is_super_admin: profile.role.is_super_admin(),
            user: Some(account),
            profile: Some(profile),
            loading: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(String),
    SignedOut,
}

#[derive(Default)]
struct SessionState {
    session: Option<AuthSession>,
    profile: Option<Profile>,
    loading: bool,
    // Bumped by every load and every clear; a load only applies its result
    // when the generation it started with is still current.
    generation: u64,
    closed: bool,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        match (&self.session, &self.profile) {
            (Some(session), Some(profile)) => SessionSnapshot {
                loading: self.loading,
                ..SessionSnapshot::signed_in(session.account.clone(), profile.clone())
            },
            _ => SessionSnapshot {
                loading: self.loading,
                ..SessionSnapshot::default()
            },
        }
    }

    fn clear(&mut self) -> Option<String> {
        self.generation += 1;
        self.loading = false;
        self.profile = None;
        self.session.take().map(|s| s.token)
    }
}

struct Inner<B: ?Sized> {
    policy: RetryPolicy,
    debounce: Duration,
    state: Mutex<SessionState>,
    backend: Arc<B>,
}

impl<B: AuthBackend + ?Sized> Inner<B> {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn fetch(&self, token: &str) -> Result<Option<(AuthSession, Profile)>, AppError> {
        let Some(session) = self.backend.get_session(token).await? else {
            return Ok(None);
        };
        let profile = ensure_profile(self.backend.as_ref(), &session.account, &self.policy).await?;
        Ok(Some((session, profile)))
    }

    async fn load(&self, token: &str) -> Result<SessionSnapshot, AppError> {
        let generation = {
            let mut state = self.lock();
            if state.closed {
                return Ok(state.snapshot());
            }
            state.generation += 1;
            state.loading = true;
            state.generation
        };

        let result = self.fetch(token).await;

        let mut state = self.lock();
        if state.closed || state.generation != generation {
            debug!("Discarding stale session load");
            return Ok(state.snapshot());
        }

        state.loading = false;
        match result {
            Ok(Some((session, profile))) => {
                state.session = Some(session);
                state.profile = Some(profile);
            }
            Ok(None) => {
                state.session = None;
                state.profile = None;
            }
            Err(err) => {
                // A failed load must not leave the previous user signed in.
                state.session = None;
                state.profile = None;
                return Err(err);
            }
        }
        Ok(state.snapshot())
    }

    async fn apply(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(token) => {
                if let Err(err) = self.load(&token).await {
                    warn!(error = %err, "Failed to load session after sign-in");
                }
            }
            AuthEvent::SignedOut => {
                self.lock().clear();
            }
        }
    }
}

/// Long-lived holder of the current session and profile.
///
/// Must be created inside a tokio runtime: it spawns the task that debounces
/// auth events.
pub struct SessionManager<B: AuthBackend + ?Sized + 'static> {
    inner: Arc<Inner<B>>,
    events: mpsc::UnboundedSender<AuthEvent>,
    listener: JoinHandle<()>,
}

impl<B: AuthBackend + ?Sized + 'static> SessionManager<B> {
    pub fn new(backend: Arc<B>, policy: RetryPolicy, debounce: Duration) -> Self {
        let inner = Arc::new(Inner {
            policy,
            debounce,
            state: Mutex::new(SessionState::default()),
            backend,
        });

        let (events, mut rx) = mpsc::unbounded_channel::<AuthEvent>();
        let listener_inner = Arc::clone(&inner);
        let listener = tokio::spawn(async move {
            while let Some(first) = rx.recv().await {
                let mut latest = first;
                // The last event inside a quiet window wins.
                while let Ok(Some(next)) =
                    tokio::time::timeout(listener_inner.debounce, rx.recv()).await
                {
                    latest = next;
                }
                listener_inner.apply(latest).await;
            }
        });

        Self {
            inner,
            events,
            listener,
        }
    }

    pub async fn initialize(&self, token: Option<&str>) -> Result<SessionSnapshot, AppError> {
        match token {
            Some(token) => self.inner.load(token).await,
            None => {
                let mut state = self.inner.lock();
                state.clear();
                Ok(state.snapshot())
            }
        }
    }

    pub fn notify(&self, event: AuthEvent) {
        if event == AuthEvent::SignedOut {
            self.inner.lock().clear();
        }
        if self.events.send(event).is_err() {
            debug!("Session listener stopped, dropping auth event");
        }
    }

    /// Local state is cleared before the backend call is awaited.
    pub async fn sign_out(&self) -> Result<(), AppError> {
        let token = self.inner.lock().clear();
        if let Some(token) = token {
            self.inner.backend.sign_out(&token).await?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().snapshot()
    }

    /// Stops reacting to events; loads still in flight are discarded.
    pub fn shutdown(&self) {
        {
            let mut state = self.inner.lock();
            state.closed = true;
            state.generation += 1;
            state.loading = false;
        }
        self.listener.abort();
    }
}

impl<B: AuthBackend + ?Sized + 'static> Drop for SessionManager<B> {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct FakeBackend {
        sessions: Mutex<HashMap<String, AuthSession>>,
        profiles: Mutex<HashMap<i64, Profile>>,
        // Number of profile reads that report nothing before the row shows up.
        hidden_reads: AtomicU32,
        conflict_on_create: bool,
        session_delay: Duration,
        failing_token: Option<String>,
        sign_out_gate: Option<Arc<Notify>>,
        get_session_calls: AtomicU32,
        get_profile_calls: AtomicU32,
        create_calls: AtomicU32,
        sign_out_calls: AtomicU32,
    }

    fn account(id: i64) -> Account {
        Account {
            id,
            email: format!("user{}@example.com", id),
            full_name: format!("User {}", id),
            created_at: Utc::now(),
        }
    }

    fn profile(id: i64, role: Role) -> Profile {
        Profile {
            id,
            full_name: format!("User {}", id),
            email: format!("user{}@example.com", id),
            role,
            height: None,
            weight: None,
            bmi: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    impl FakeBackend {
        fn with_session(self, token: &str, user_id: i64) -> Self {
            self.sessions.lock().unwrap().insert(
                token.to_string(),
                AuthSession {
                    token: token.to_string(),
                    account: account(user_id),
                    expires_at: (Utc::now() + chrono::Duration::hours(1)).naive_utc(),
                },
            );
            self
        }

        fn with_profile(self, user_id: i64, role: Role) -> Self {
            self.profiles
                .lock()
                .unwrap()
                .insert(user_id, profile(user_id, role));
            self
        }
    }

    #[rocket::async_trait]
    impl AuthBackend for FakeBackend {
        async fn get_session(&self, token: &str) -> Result<Option<AuthSession>, AppError> {
            self.get_session_calls.fetch_add(1, Ordering::SeqCst);
            if !self.session_delay.is_zero() {
                tokio::time::sleep(self.session_delay).await;
            }
            if self.failing_token.as_deref() == Some(token) {
                return Err(AppError::ExternalService(
                    "Auth backend unavailable".to_string(),
                ));
            }
            Ok(self.sessions.lock().unwrap().get(token).cloned())
        }

        async fn get_profile(&self, user_id: i64) -> Result<Option<Profile>, AppError> {
            self.get_profile_calls.fetch_add(1, Ordering::SeqCst);
            let hidden = self.hidden_reads.load(Ordering::SeqCst);
            if hidden > 0 {
                self.hidden_reads.store(hidden - 1, Ordering::SeqCst);
                return Ok(None);
            }
            Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
        }

        async fn create_profile(&self, new: &NewProfile) -> Result<Profile, AppError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let created = profile(new.id, new.role);
            self.profiles.lock().unwrap().insert(new.id, created.clone());
            if self.conflict_on_create {
                return Err(AppError::Conflict("Profile already exists".to_string()));
            }
            Ok(created)
        }

        async fn sign_out(&self, _token: &str) -> Result<(), AppError> {
            if let Some(gate) = &self.sign_out_gate {
                gate.notified().await;
            }
            self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn quick_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn ensure_profile_waits_for_lagging_row() {
        let backend = FakeBackend {
            hidden_reads: AtomicU32::new(2),
            ..Default::default()
        }
        .with_profile(1, Role::User);

        let found = ensure_profile(&backend, &account(1), &quick_policy())
            .await
            .expect("profile should appear on the third read");

        assert_eq!(found.id, 1);
        assert_eq!(backend.get_profile_calls.load(Ordering::SeqCst), 3);
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ensure_profile_creates_after_exhausting_attempts() {
        let backend = FakeBackend::default();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(20),
        };

        let started = Instant::now();
        let created = ensure_profile(&backend, &account(7), &policy)
            .await
            .expect("profile should be created");

        assert_eq!(created.id, 7);
        assert_eq!(created.role, Role::User);
        assert_eq!(backend.get_profile_calls.load(Ordering::SeqCst), 3);
        assert_eq!(backend.create_calls.load(Ordering::SeqCst), 1);
        // 20ms after the first read, 40ms after the second.
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn conflicting_create_falls_back_to_fetch() {
        let backend = FakeBackend {
            conflict_on_create: true,
            ..Default::default()
        };

        let found = ensure_profile(&backend, &account(3), &quick_policy())
            .await
            .expect("conflict should resolve through a fetch");

        assert_eq!(found.id, 3);
        assert_eq!(backend.get_profile_calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn initialize_exposes_role_flags() {
        let backend = Arc::new(
            FakeBackend::default()
                .with_session("admin-token", 2)
                .with_profile(2, Role::AdminFitness),
        );
        let manager = SessionManager::new(backend, quick_policy(), Duration::from_millis(10));

        let snapshot = manager.initialize(Some("admin-token")).await.unwrap();

        assert!(snapshot.is_authenticated);
        assert!(snapshot.is_admin);
        assert!(!snapshot.is_super_admin);
        assert!(!snapshot.loading);
        assert_eq!(snapshot.user.unwrap().id, 2);
    }

    #[tokio::test]
    async fn unknown_token_yields_signed_out_snapshot() {
        let backend = Arc::new(FakeBackend::default());
        let manager = SessionManager::new(backend, quick_policy(), Duration::from_millis(10));

        let snapshot = manager.initialize(Some("missing")).await.unwrap();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.profile.is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_state_before_backend_resolves() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(
            FakeBackend {
                sign_out_gate: Some(Arc::clone(&gate)),
                ..Default::default()
            }
            .with_session("token", 1)
            .with_profile(1, Role::User),
        );
        let manager = Arc::new(SessionManager::new(
            Arc::clone(&backend),
            quick_policy(),
            Duration::from_millis(10),
        ));
        manager.initialize(Some("token")).await.unwrap();
        assert!(manager.snapshot().is_authenticated);

        let signing_out = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.sign_out().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!manager.snapshot().is_authenticated);
        assert_eq!(backend.sign_out_calls.load(Ordering::SeqCst), 0);

        gate.notify_one();
        signing_out.await.unwrap().unwrap();
        assert_eq!(backend.sign_out_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_discards_in_flight_load() {
        let backend = Arc::new(
            FakeBackend {
                session_delay: Duration::from_millis(50),
                ..Default::default()
            }
            .with_session("token", 1)
            .with_profile(1, Role::User),
        );
        let manager = Arc::new(SessionManager::new(
            backend,
            quick_policy(),
            Duration::from_millis(10),
        ));

        let loading = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.initialize(Some("token")).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        manager.shutdown();

        let result = loading.await.unwrap();
        assert!(result.is_ok());
        assert!(!manager.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn sign_in_events_are_debounced() {
        let backend = Arc::new(
            FakeBackend::default()
                .with_session("first", 1)
                .with_session("second", 2)
                .with_profile(1, Role::User)
                .with_profile(2, Role::AdminSuper),
        );
        let manager = SessionManager::new(
            Arc::clone(&backend),
            quick_policy(),
            Duration::from_millis(30),
        );

        manager.notify(AuthEvent::SignedIn("first".to_string()));
        manager.notify(AuthEvent::SignedIn("second".to_string()));

        tokio::time::sleep(Duration::from_millis(150)).await;

        let snapshot = manager.snapshot();
        assert!(snapshot.is_super_admin);
        assert_eq!(snapshot.user.unwrap().id, 2);
        assert_eq!(backend.get_session_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sign_out_event_clears_immediately() {
        let backend = Arc::new(
            FakeBackend::default()
                .with_session("token", 1)
                .with_profile(1, Role::User),
        );
        let manager = SessionManager::new(backend, quick_policy(), Duration::from_secs(5));
        manager.initialize(Some("token")).await.unwrap();

        manager.notify(AuthEvent::SignedOut);

        assert!(!manager.snapshot().is_authenticated);
    }

    #[tokio::test]
    async fn failed_sign_in_drops_previous_user() {
        let backend = Arc::new(
            FakeBackend {
                failing_token: Some("broken".to_string()),
                ..Default::default()
            }
            .with_session("boss", 1)
            .with_profile(1, Role::AdminSuper),
        );
        let manager = SessionManager::new(
            Arc::clone(&backend),
            quick_policy(),
            Duration::from_millis(10),
        );
        let snapshot = manager.initialize(Some("boss")).await.unwrap();
        assert!(snapshot.is_super_admin);

        let result = manager.initialize(Some("broken")).await;
        assert!(matches!(result, Err(AppError::ExternalService(_))));
        let snapshot = manager.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(!snapshot.is_super_admin);
        assert!(snapshot.profile.is_none());

        manager.initialize(Some("boss")).await.unwrap();
        manager.notify(AuthEvent::SignedIn("broken".to_string()));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!manager.snapshot().is_authenticated);
    }
}
