use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, RwLock, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::storage::{PersistedSession, SessionStorage};
use crate::api::auth::{AuthApi, AuthResponse, LoginCredentials, RegisterProfile};
use crate::api::ApiError;
use crate::models::UserRecord;
use crate::utils::mask_token;

/// Buffer size for the session event channel.
/// Events are rare (sign-in, refresh, sign-out); slow receivers just miss old ones.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Session transitions, broadcast to whoever subscribed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    Refreshed,
    SignedOut,
    /// The session could not be renewed; the user has to sign in again.
    LoginRequired,
}

/// Structured login/register failure. `message` is fit for display.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AuthError {
    pub message: String,
    pub status: Option<u16>,
}

impl AuthError {
    /// Use the backend's `message` field when it sent a non-blank one, else `fallback`.
    fn from_api(err: &ApiError, fallback: &str) -> Self {
        let message = err
            .backend_message()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string();
        Self {
            message,
            status: err.status(),
        }
    }
}

/// In-memory authentication state.
#[derive(Clone, Default)]
pub struct SessionState {
    pub user: Option<UserRecord>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub last_error: Option<String>,
    pub is_pending: bool,
}

impl SessionState {
    /// True iff a user is present and the access credential is non-empty.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    fn from_persisted(record: PersistedSession) -> Self {
        Self {
            user: record.user,
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            last_error: None,
            is_pending: false,
        }
    }

    pub fn to_persisted(&self) -> PersistedSession {
        PersistedSession {
            user: self.user.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            is_authenticated: self.is_authenticated(),
        }
    }

    fn establish(&mut self, auth: AuthResponse) {
        self.user = Some(auth.user);
        self.access_token = Some(auth.access_token);
        self.refresh_token = Some(auth.refresh_token);
        self.last_error = None;
        self.is_pending = false;
    }

    fn clear(&mut self) {
        self.user = None;
        self.access_token = None;
        self.refresh_token = None;
        self.last_error = None;
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("user", &self.user.as_ref().map(UserRecord::display_name))
            .field("access_token", &self.access_token.as_deref().map(mask_token))
            .field("refresh_token", &self.refresh_token.as_deref().map(mask_token))
            .field("last_error", &self.last_error)
            .field("is_pending", &self.is_pending)
            .finish()
    }
}

/// Single owner of "who is signed in".
///
/// Share it as `Arc<SessionStore>`; every mutation goes through its operations.
/// When storage is attached, every mutating operation writes the persisted
/// record through after the in-memory transition.
pub struct SessionStore {
    auth: Arc<dyn AuthApi>,
    storage: Option<Arc<dyn SessionStorage>>,
    state: RwLock<SessionState>,
    refresh_gate: Mutex<()>,
    persist_order: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// An empty, signed-out store without persistence.
    pub fn new(auth: Arc<dyn AuthApi>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            auth,
            storage: None,
            state: RwLock::new(SessionState::default()),
            refresh_gate: Mutex::new(()),
            persist_order: Mutex::new(()),
            events,
        }
    }

    /// Rehydrate from storage. An unreadable record is logged and the store starts empty.
    pub fn restore(auth: Arc<dyn AuthApi>, storage: Arc<dyn SessionStorage>) -> Self {
        let state = match storage.load() {
            Ok(Some(record)) => {
                let state = SessionState::from_persisted(record);
                debug!(authenticated = state.is_authenticated(), "Session restored");
                state
            }
            Ok(None) => {
                debug!("No persisted session found");
                SessionState::default()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session, starting signed out");
                SessionState::default()
            }
        };

        let mut store = Self::new(auth);
        store.state = RwLock::new(state);
        store.storage = Some(storage);
        store
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ===== Reads =====

    /// Current access credential, read fresh on every call.
    pub async fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn user(&self) -> Option<UserRecord> {
        self.state.read().await.user.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.read().await.last_error.clone()
    }

    pub async fn is_pending(&self) -> bool {
        self.state.read().await.is_pending
    }

    pub async fn clear_error(&self) {
        self.state.write().await.last_error = None;
    }

    // ===== Operations =====

    /// Sign in with email and password.
    ///
    /// On failure the previous state is kept and `last_error` holds the message.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(), AuthError> {
        self.begin().await;
        let result = self.auth.login(credentials).await;
        self.finish_sign_in(result, "Login failed").await
    }

    /// Create an account. Success signs the new user in.
    pub async fn register(&self, profile: &RegisterProfile) -> Result<(), AuthError> {
        self.begin().await;
        let result = self.auth.register(profile).await;
        self.finish_sign_in(result, "Registration failed").await
    }

    /// Exchange the refresh credential for a new token pair.
    ///
    /// Returns `false` without a network call when there is no refresh
    /// credential. Any failure signs the user out. Never errors outward.
    pub async fn refresh_access_token(&self) -> bool {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request that was rejected while carrying `rejected`.
    ///
    /// Concurrent callers queue on one gate. A caller that finds the store
    /// already holding a different credential reports success without
    /// refreshing again.
    pub async fn refresh_after_rejection(&self, rejected: Option<&str>) -> bool {
        let _gate = self.refresh_gate.lock().await;
        {
            let state = self.state.read().await;
            if let Some(current) = state.access_token.as_deref() {
                if !current.is_empty() && Some(current) != rejected {
                    debug!("Access token already rotated by a concurrent refresh");
                    return true;
                }
            }
        }
        self.refresh_locked().await
    }

    /// Clear user and credentials. Idempotent.
    pub async fn logout(&self) {
        let was_authenticated = {
            let mut state = self.state.write().await;
            let was_authenticated = state.is_authenticated();
            state.clear();
            self.persist(state).await;
            was_authenticated
        };
        if was_authenticated {
            info!("Signed out");
        }
        self.emit(SessionEvent::SignedOut);
    }

    /// Shallow-merge profile fields into the user record. Tokens are untouched.
    pub async fn update_user(&self, partial: Map<String, Value>) {
        let mut state = self.state.write().await;
        state
            .user
            .get_or_insert_with(UserRecord::default)
            .merge(partial);
        self.persist(state).await;
    }

    /// Announce that the user must sign in again.
    pub fn request_login(&self) {
        self.emit(SessionEvent::LoginRequired);
    }

    // ===== Internals =====

    async fn begin(&self) {
        let mut state = self.state.write().await;
        state.is_pending = true;
        state.last_error = None;
    }

    async fn finish_sign_in(
        &self,
        result: Result<AuthResponse, ApiError>,
        fallback: &str,
    ) -> Result<(), AuthError> {
        match result {
            Ok(auth) => {
                {
                    let mut state = self.state.write().await;
                    state.establish(auth);
                    info!(
                        user_id = ?state.user.as_ref().and_then(UserRecord::id),
                        "Signed in"
                    );
                    self.persist(state).await;
                }
                self.emit(SessionEvent::SignedIn);
                Ok(())
            }
            Err(e) => {
                let err = AuthError::from_api(&e, fallback);
                warn!(error = %e, "{}", fallback);
                let mut state = self.state.write().await;
                state.is_pending = false;
                state.last_error = Some(err.message.clone());
                Err(err)
            }
        }
    }

    /// Caller holds the refresh gate.
    async fn refresh_locked(&self) -> bool {
        let refresh_token = {
            let mut state = self.state.write().await;
            match state.refresh_token.clone().filter(|t| !t.is_empty()) {
                Some(token) => {
                    state.is_pending = true;
                    token
                }
                None => {
                    debug!("No refresh token available");
                    drop(state);
                    self.logout().await;
                    return false;
                }
            }
        };

        debug!(refresh_token = %mask_token(&refresh_token), "Refreshing access token");
        let result = self.auth.refresh(&refresh_token).await;

        match result {
            Ok(pair) => {
                {
                    let mut state = self.state.write().await;
                    state.is_pending = false;
                    // A logout while the refresh was in flight wins.
                    if state.refresh_token.as_deref() != Some(refresh_token.as_str()) {
                        debug!("Session changed during refresh, discarding new tokens");
                        return false;
                    }
                    state.access_token = Some(pair.access_token);
                    state.refresh_token = Some(pair.refresh_token);
                    self.persist(state).await;
                }
                info!("Access token refreshed");
                self.emit(SessionEvent::Refreshed);
                true
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, signing out");
                self.state.write().await.is_pending = false;
                self.logout().await;
                false
            }
        }
    }

    /// Write the record through, consuming the state guard.
    ///
    /// The save runs on the blocking pool after the guard is released, so
    /// readers never wait on storage I/O. `persist_order` is taken while the
    /// guard is still held, which keeps saves in mutation order.
    async fn persist(&self, state: RwLockWriteGuard<'_, SessionState>) {
        let Some(storage) = self.storage.clone() else {
            return;
        };
        let record = state.to_persisted();
        let _order = self.persist_order.lock().await;
        drop(state);

        match tokio::task::spawn_blocking(move || storage.save(&record)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to persist session"),
            Err(e) => warn!(error = %e, "Session save task failed"),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{auth_body, token_body, StubTransport};
    use crate::api::{HttpAuthApi, TokenPair};
    use crate::auth::MemoryStorage;
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Auth backend that parks every call until the test releases it.
    #[derive(Default)]
    struct HeldAuthApi {
        entered: Notify,
        release: Notify,
    }

    impl HeldAuthApi {
        async fn hold(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    #[async_trait]
    impl AuthApi for HeldAuthApi {
        async fn login(&self, _: &LoginCredentials) -> Result<AuthResponse, ApiError> {
            self.hold().await;
            Ok(serde_json::from_value(auth_body("tok1", "rtok1")).unwrap())
        }

        async fn register(&self, _: &RegisterProfile) -> Result<AuthResponse, ApiError> {
            self.hold().await;
            Ok(serde_json::from_value(auth_body("tok1", "rtok1")).unwrap())
        }

        async fn refresh(&self, _: &str) -> Result<TokenPair, ApiError> {
            self.hold().await;
            Ok(serde_json::from_value(token_body("tok2", "rtok2")).unwrap())
        }
    }

    /// Storage whose saves block once armed, until the test sends a release.
    struct GatedStorage {
        armed: AtomicBool,
        started: AtomicBool,
        released: AtomicBool,
        release: std::sync::Mutex<Option<std_mpsc::Receiver<()>>>,
    }

    impl SessionStorage for GatedStorage {
        fn load(&self) -> anyhow::Result<Option<PersistedSession>> {
            Ok(None)
        }

        fn save(&self, _: &PersistedSession) -> anyhow::Result<()> {
            if !self.armed.load(Ordering::SeqCst) {
                return Ok(());
            }
            self.started.store(true, Ordering::SeqCst);
            if let Some(release) = self.release.lock().unwrap().take() {
                let released = release.recv_timeout(Duration::from_secs(5)).is_ok();
                self.released.store(released, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn store_with(stub: &Arc<StubTransport>, storage: &Arc<MemoryStorage>) -> SessionStore {
        let auth = Arc::new(HttpAuthApi::new(stub.clone()));
        SessionStore::restore(auth, storage.clone())
    }

    async fn signed_in(stub: &Arc<StubTransport>, storage: &Arc<MemoryStorage>) -> SessionStore {
        stub.respond(Method::POST, "/auth/login", 200, auth_body("tok1", "rtok1"));
        let store = store_with(stub, storage);
        store
            .login(&LoginCredentials::new("a@b.com", "secret"))
            .await
            .expect("login should succeed");
        store
    }

    #[tokio::test]
    async fn test_login_success_establishes_session() {
        let stub = Arc::new(StubTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = signed_in(&stub, &storage).await;

        let state = store.snapshot().await;
        assert!(state.is_authenticated());
        assert!(!state.is_pending);
        assert_eq!(state.last_error, None);
        assert_eq!(state.access_token.as_deref(), Some("tok1"));
        assert_eq!(state.refresh_token.as_deref(), Some("rtok1"));
        assert_eq!(state.user.as_ref().and_then(UserRecord::id), Some(1));

        let sent = stub.sent_to(Method::POST, "/auth/login");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body,
            crate::api::RequestBody::Json(json!({"email": "a@b.com", "password": "secret"}))
        );
        // Auth endpoints are called without a bearer credential
        assert_eq!(sent[0].bearer(), None);
    }

    #[tokio::test]
    async fn test_login_persists_and_reloads() {
        let stub = Arc::new(StubTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = signed_in(&stub, &storage).await;

        let record = storage.load().unwrap().expect("record written");
        assert_eq!(record.access_token.as_deref(), Some("tok1"));
        assert_eq!(record.refresh_token.as_deref(), Some("rtok1"));
        assert!(record.is_authenticated);

        let reloaded = store_with(&stub, &storage);
        let state = reloaded.snapshot().await;
        assert_eq!(state.to_persisted(), record);

        store.logout().await;
        let cleared = storage.load().unwrap().expect("record written");
        assert_eq!(cleared, PersistedSession::default());
        assert!(!store_with(&stub, &storage).is_authenticated().await);
    }

    #[tokio::test]
    async fn test_login_failure_keeps_state_and_records_message() {
        let stub = Arc::new(StubTransport::new());
        stub.respond(
            Method::POST,
            "/auth/login",
            401,
            json!({"message": "Invalid email or password"}),
        );
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&stub, &storage);

        let err = store
            .login(&LoginCredentials::new("a@b.com", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid email or password");
        assert_eq!(err.status, Some(401));

        let state = store.snapshot().await;
        assert!(!state.is_authenticated());
        assert!(!state.is_pending);
        assert_eq!(state.last_error.as_deref(), Some("Invalid email or password"));
        // Nothing to write on failure
        assert_eq!(storage.load().unwrap(), None);
        // A failed login never triggers a refresh
        assert_eq!(stub.count(Method::POST, "/auth/refresh"), 0);

        store.clear_error().await;
        assert_eq!(store.last_error().await, None);
    }

    #[tokio::test]
    async fn test_register_network_failure_uses_fallback_message() {
        let stub = Arc::new(StubTransport::new());
        stub.respond_timeout(Method::POST, "/auth/register");
        let store = store_with(&stub, &Arc::new(MemoryStorage::new()));

        let profile = RegisterProfile {
            full_name: "A".to_string(),
            email: "a@b.com".to_string(),
            phone: Some("555-0100".to_string()),
            password: "secret".to_string(),
        };
        let err = store.register(&profile).await.unwrap_err();
        assert_eq!(err.message, "Registration failed");
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn test_register_success_signs_in() {
        let stub = Arc::new(StubTransport::new());
        stub.respond(Method::POST, "/auth/register", 201, auth_body("tok9", "rtok9"));
        let store = store_with(&stub, &Arc::new(MemoryStorage::new()));
        let mut events = store.subscribe();

        let profile = RegisterProfile {
            full_name: "A".to_string(),
            email: "a@b.com".to_string(),
            phone: None,
            password: "secret".to_string(),
        };
        store.register(&profile).await.unwrap();
        assert!(store.is_authenticated().await);
        assert_eq!(store.access_token().await.as_deref(), Some("tok9"));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedIn);
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_skips_network() {
        let stub = Arc::new(StubTransport::new());
        let store = store_with(&stub, &Arc::new(MemoryStorage::new()));

        assert!(!store.refresh_access_token().await);
        assert!(stub.sent().is_empty());

        let state = store.snapshot().await;
        assert!(!state.is_authenticated());
        assert!(state.user.is_none());
        assert!(state.access_token.is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_tokens_repeatedly() {
        let stub = Arc::new(StubTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = signed_in(&stub, &storage).await;

        stub.respond(Method::POST, "/auth/refresh", 200, token_body("tok2", "rtok2"));
        stub.respond(Method::POST, "/auth/refresh", 200, token_body("tok3", "rtok3"));

        assert!(store.refresh_access_token().await);
        assert_eq!(store.access_token().await.as_deref(), Some("tok2"));
        assert!(store.refresh_access_token().await);
        assert_eq!(store.access_token().await.as_deref(), Some("tok3"));
        assert!(store.is_authenticated().await);

        let bodies: Vec<_> = stub
            .sent_to(Method::POST, "/auth/refresh")
            .into_iter()
            .map(|r| r.body)
            .collect();
        assert_eq!(
            bodies,
            vec![
                crate::api::RequestBody::Json(json!({"refreshToken": "rtok1"})),
                crate::api::RequestBody::Json(json!({"refreshToken": "rtok2"})),
            ]
        );

        let record = storage.load().unwrap().unwrap();
        assert_eq!(record.access_token.as_deref(), Some("tok3"));
        assert_eq!(record.refresh_token.as_deref(), Some("rtok3"));
    }

    #[tokio::test]
    async fn test_refresh_rejected_clears_session() {
        let stub = Arc::new(StubTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = signed_in(&stub, &storage).await;
        let mut events = store.subscribe();

        stub.respond(Method::POST, "/auth/refresh", 401, json!({"message": "Refresh token expired"}));

        assert!(!store.refresh_access_token().await);
        let state = store.snapshot().await;
        assert!(!state.is_authenticated());
        assert!(state.user.is_none());
        assert!(state.access_token.is_none());
        assert!(state.refresh_token.is_none());
        assert!(!state.is_pending);

        // No stale credential left behind
        assert_eq!(storage.load().unwrap(), Some(PersistedSession::default()));
        assert_eq!(events.try_recv().unwrap(), SessionEvent::SignedOut);
    }

    #[tokio::test]
    async fn test_refresh_after_rejection_coalesces() {
        let stub = Arc::new(StubTransport::new());
        let store = signed_in(&stub, &Arc::new(MemoryStorage::new())).await;
        stub.respond(Method::POST, "/auth/refresh", 200, token_body("tok2", "rtok2"));

        // First waiter refreshes, the second sees the rotated credential.
        assert!(store.refresh_after_rejection(Some("tok1")).await);
        assert!(store.refresh_after_rejection(Some("tok1")).await);
        assert_eq!(stub.count(Method::POST, "/auth/refresh"), 1);
        assert_eq!(store.access_token().await.as_deref(), Some("tok2"));

        // The current credential itself was rejected: refresh again.
        stub.respond(Method::POST, "/auth/refresh", 200, token_body("tok3", "rtok3"));
        assert!(store.refresh_after_rejection(Some("tok2")).await);
        assert_eq!(stub.count(Method::POST, "/auth/refresh"), 2);
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let stub = Arc::new(StubTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = signed_in(&stub, &storage).await;

        store.logout().await;
        store.logout().await;
        assert!(!store.is_authenticated().await);
        assert_eq!(store.user().await, None);
        assert_eq!(storage.load().unwrap(), Some(PersistedSession::default()));
    }

    #[tokio::test]
    async fn test_update_user_merges_without_touching_tokens() {
        let stub = Arc::new(StubTransport::new());
        let storage = Arc::new(MemoryStorage::new());
        let store = signed_in(&stub, &storage).await;

        let partial = json!({"fullName": "Prince", "phone": "555"});
        store
            .update_user(partial.as_object().cloned().unwrap_or_default())
            .await;

        let user = store.user().await.unwrap();
        assert_eq!(user.id(), Some(1));
        assert_eq!(user.full_name(), Some("Prince"));
        assert_eq!(user.get("phone"), Some(&json!("555")));
        assert_eq!(store.access_token().await.as_deref(), Some("tok1"));

        let record = storage.load().unwrap().unwrap();
        assert_eq!(record.user.unwrap().full_name(), Some("Prince"));
    }

    #[tokio::test]
    async fn test_restore_derives_authentication() {
        let stub = Arc::new(StubTransport::new());
        // Stored flag disagrees with the data: the data wins.
        let storage = Arc::new(MemoryStorage::with_record(PersistedSession {
            user: None,
            access_token: Some("tok1".to_string()),
            refresh_token: Some("rtok1".to_string()),
            is_authenticated: true,
        }));
        let store = store_with(&stub, &storage);
        assert!(!store.is_authenticated().await);
        assert_eq!(store.access_token().await.as_deref(), Some("tok1"));
    }

    #[tokio::test]
    async fn test_restore_from_unreadable_storage_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(crate::auth::FileStorage::in_dir(dir.path()));
        std::fs::write(storage.path(), "{broken").unwrap();

        let stub = Arc::new(StubTransport::new());
        let store = SessionStore::restore(Arc::new(HttpAuthApi::new(stub)), storage);
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_register_failure_without_message_field_uses_fallback() {
        let stub = Arc::new(StubTransport::new());
        stub.respond(
            Method::POST,
            "/auth/register",
            500,
            json!({
                "timestamp": "2024-06-10T12:00:00.000+00:00",
                "status": 500,
                "error": "Internal Server Error",
                "path": "/api/auth/register"
            }),
        );
        let store = store_with(&stub, &Arc::new(MemoryStorage::new()));

        let profile = RegisterProfile {
            full_name: "A".to_string(),
            email: "a@b.com".to_string(),
            phone: None,
            password: "secret".to_string(),
        };
        let err = store.register(&profile).await.unwrap_err();
        assert_eq!(err.message, "Registration failed");
        assert_eq!(err.status, Some(500));
        assert_eq!(store.last_error().await.as_deref(), Some("Registration failed"));
    }

    #[tokio::test]
    async fn test_blank_backend_message_uses_fallback() {
        let stub = Arc::new(StubTransport::new());
        stub.respond(Method::POST, "/auth/login", 400, json!({"message": "  "}));
        let store = store_with(&stub, &Arc::new(MemoryStorage::new()));

        let err = store
            .login(&LoginCredentials::new("a@b.com", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Login failed");
    }

    #[tokio::test]
    async fn test_rate_limited_login_shows_backend_message() {
        let stub = Arc::new(StubTransport::new());
        stub.respond(
            Method::POST,
            "/auth/login",
            429,
            json!({"message": "Too many attempts, try again later"}),
        );
        let store = store_with(&stub, &Arc::new(MemoryStorage::new()));

        let err = store
            .login(&LoginCredentials::new("a@b.com", "secret"))
            .await
            .unwrap_err();
        assert_eq!(err.message, "Too many attempts, try again later");
        assert_eq!(err.status, Some(429));
    }

    #[tokio::test]
    async fn test_pending_while_auth_call_in_flight() {
        let auth = Arc::new(HeldAuthApi::default());
        let store = Arc::new(SessionStore::new(auth.clone()));
        assert!(!store.is_pending().await);

        let login = tokio::spawn({
            let store = store.clone();
            async move { store.login(&LoginCredentials::new("a@b.com", "secret")).await }
        });
        auth.entered.notified().await;
        assert!(store.is_pending().await);
        assert!(!store.is_authenticated().await);
        auth.release.notify_one();
        login.await.unwrap().unwrap();
        assert!(!store.is_pending().await);
        assert!(store.is_authenticated().await);

        let refresh = tokio::spawn({
            let store = store.clone();
            async move { store.refresh_access_token().await }
        });
        auth.entered.notified().await;
        assert!(store.is_pending().await);
        // The old credential stays readable during the refresh
        assert_eq!(store.access_token().await.as_deref(), Some("tok1"));
        auth.release.notify_one();
        assert!(refresh.await.unwrap());
        assert!(!store.is_pending().await);
        assert_eq!(store.access_token().await.as_deref(), Some("tok2"));
    }

    #[tokio::test]
    async fn test_next_login_attempt_clears_last_error() {
        let stub = Arc::new(StubTransport::new());
        stub.respond(Method::POST, "/auth/login", 401, json!({"message": "Invalid email or password"}));
        stub.respond(Method::POST, "/auth/login", 200, auth_body("tok1", "rtok1"));
        let store = store_with(&stub, &Arc::new(MemoryStorage::new()));

        assert!(store
            .login(&LoginCredentials::new("a@b.com", "wrong"))
            .await
            .is_err());
        assert_eq!(store.last_error().await.as_deref(), Some("Invalid email or password"));

        store
            .login(&LoginCredentials::new("a@b.com", "secret"))
            .await
            .unwrap();
        assert_eq!(store.last_error().await, None);
        assert!(store.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_reads_proceed_while_session_is_saved() {
        let stub = Arc::new(StubTransport::new());
        stub.respond(Method::POST, "/auth/login", 200, auth_body("tok1", "rtok1"));
        let (release, gate) = std_mpsc::channel();
        let storage = Arc::new(GatedStorage {
            armed: AtomicBool::new(false),
            started: AtomicBool::new(false),
            released: AtomicBool::new(false),
            release: std::sync::Mutex::new(Some(gate)),
        });
        let store = Arc::new(SessionStore::restore(
            Arc::new(HttpAuthApi::new(stub.clone())),
            storage.clone(),
        ));
        store
            .login(&LoginCredentials::new("a@b.com", "secret"))
            .await
            .unwrap();

        storage.armed.store(true, Ordering::SeqCst);
        let logout = tokio::spawn({
            let store = store.clone();
            async move { store.logout().await }
        });
        while !storage.started.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }

        // The save is parked; state is already readable.
        assert_eq!(store.access_token().await, None);
        release.send(()).unwrap();
        logout.await.unwrap();
        assert!(storage.released.load(Ordering::SeqCst));
    }
}
