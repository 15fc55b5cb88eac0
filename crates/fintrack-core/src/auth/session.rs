use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::error::{INVALID_CREDENTIALS_MESSAGE, SESSION_REJECTED_MESSAGE};
use crate::api::{ApiError, ApiRequest, CredentialSource, ErrorKind, Gateway};
use crate::cache::CachedData;
use crate::config::{Config, Endpoints};
use crate::models::{RegistrationForm, UserProfile};

use super::credentials::{AuthScheme, Credential};
use super::store::{CredentialStore, PROFILE_KEY, TOKEN_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// Startup revalidation has not finished.
    Loading,
    Anonymous,
    Authenticated,
}

/// In-memory projection of the session. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    /// Set only after the backend has accepted the credential.
    pub user: Option<UserProfile>,
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
        }
    }
}

impl SessionState {
    fn anonymous() -> Self {
        Self {
            user: None,
            loading: false,
        }
    }

    fn authenticated(user: UserProfile) -> Self {
        Self {
            user: Some(user),
            loading: false,
        }
    }

    pub fn status(&self) -> AuthStatus {
        if self.user.is_some() {
            AuthStatus::Authenticated
        } else if self.loading {
            AuthStatus::Loading
        } else {
            AuthStatus::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    user: UserProfile,
    #[serde(alias = "credential")]
    token: String,
}

/// Credential slot, durable store and session projection, shared between the
/// manager and its gateway.
struct SessionCore {
    store: Arc<dyn CredentialStore>,
    credential: RwLock<Option<Credential>>,
    state: watch::Sender<SessionState>,
    /// Bumped on every login, logout and invalidation. Late results compare
    /// against it before touching state.
    epoch: AtomicU64,
}

impl SessionCore {
    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn stored_credential(&self) -> Option<Credential> {
        match self.store.get(TOKEN_KEY) {
            Ok(value) => value.map(Credential::restored).filter(|c| !c.is_blank()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    fn save_profile_snapshot(&self, user: &UserProfile) {
        let snapshot = CachedData::new(user.clone());
        let result = serde_json::to_string(&snapshot)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set(PROFILE_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "Failed to save profile snapshot");
        }
    }

    fn clear_storage(&self) {
        for key in [TOKEN_KEY, PROFILE_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to clear stored entry");
            }
        }
    }

    // Slot, storage and state only change together, under the slot lock.

    fn establish(&self, credential: Credential, user: UserProfile) {
        let mut slot = self.credential.write();
        self.bump_epoch();
        if let Err(e) = self.store.set(TOKEN_KEY, credential.value()) {
            // The in-memory slot still carries the session for this run
            warn!(error = %e, "Failed to persist credential");
        }
        self.save_profile_snapshot(&user);
        *slot = Some(credential);
        self.state.send_replace(SessionState::authenticated(user));
    }

    fn clear(&self) {
        let mut slot = self.credential.write();
        self.bump_epoch();
        *slot = None;
        self.clear_storage();
        self.state.send_replace(SessionState::anonymous());
    }

    /// Clear only if `credential` is still the active one.
    fn discard(&self, credential: &Credential) -> bool {
        let mut slot = self.credential.write();
        if slot.as_ref() != Some(credential) {
            return false;
        }
        self.bump_epoch();
        *slot = None;
        self.clear_storage();
        self.state.send_replace(SessionState::anonymous());
        true
    }

    /// End loading with no user, unless a login landed meanwhile.
    fn settle_anonymous(&self) {
        let slot = self.credential.read();
        if slot.is_none() {
            self.state.send_replace(SessionState::anonymous());
        }
    }

    /// Install a restored, not yet validated credential. Returns the new epoch.
    fn begin_restore(&self, credential: Credential) -> u64 {
        let mut slot = self.credential.write();
        let epoch = self.bump_epoch();
        *slot = Some(credential);
        self.state.send_replace(SessionState::default());
        epoch
    }

    /// Apply a validated profile if nothing replaced the session since `epoch`.
    fn finish_restore(&self, epoch: u64, credential: &Credential, user: UserProfile) -> bool {
        let slot = self.credential.read();
        if self.epoch() != epoch || slot.as_ref() != Some(credential) {
            return false;
        }
        self.save_profile_snapshot(&user);
        self.state.send_replace(SessionState::authenticated(user));
        true
    }
}

impl CredentialSource for SessionCore {
    fn credential(&self) -> Option<Credential> {
        self.credential.read().clone()
    }

    fn reject(&self, credential: &Credential) {
        if self.discard(credential) {
            info!("Credential rejected by backend, session cleared");
        } else {
            debug!("Ignoring rejection of a superseded credential");
        }
    }
}

/// Single source of truth for who is logged in.
///
/// Construct one at the application root and hand clones (or subscriptions) to
/// whatever needs it. Clone is cheap; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    core: Arc<SessionCore>,
    gateway: Gateway,
    endpoints: Endpoints,
}

impl SessionManager {
    pub fn new(config: &Config, store: Arc<dyn CredentialStore>) -> anyhow::Result<Self> {
        let (state, _) = watch::channel(SessionState::default());
        let core = Arc::new(SessionCore {
            store,
            credential: RwLock::new(None),
            state,
            epoch: AtomicU64::new(0),
        });
        let gateway = Gateway::new(config, core.clone())?;

        Ok(Self {
            core,
            gateway,
            endpoints: config.endpoints.clone(),
        })
    }

    /// Gateway bound to this session's credential.
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn state(&self) -> SessionState {
        self.core.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.core.state.subscribe()
    }

    pub fn status(&self) -> AuthStatus {
        self.core.state.borrow().status()
    }

    pub fn is_authenticated(&self) -> bool {
        self.core.state.borrow().is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.core.state.borrow().user.clone()
    }

    /// Whether a credential is held, validated or not.
    pub fn has_credential(&self) -> bool {
        self.core.credential.read().is_some()
    }

    /// Last profile written to storage. A display hint only.
    pub fn cached_profile(&self) -> Option<CachedData<UserProfile>> {
        let raw = match self.core.store.get(PROFILE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read profile snapshot");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable profile snapshot");
                None
            }
        }
    }

    fn current_user_request(&self, credential: &Credential) -> Result<ApiRequest, ApiError> {
        match self.gateway.scheme() {
            AuthScheme::Bearer => Ok(ApiRequest::get(&self.endpoints.current_user)),
            AuthScheme::Basic => {
                let username = credential.basic_identifier().ok_or_else(|| {
                    ApiError::Authentication(SESSION_REJECTED_MESSAGE.to_string())
                })?;
                Ok(ApiRequest::get(self.endpoints.basic_login_path(&username)))
            }
        }
    }

    /// Re-establish the session from the stored credential.
    ///
    /// Fails closed: any error while revalidating discards the credential. Never
    /// returns an error; the outcome is the resulting status.
    pub async fn bootstrap(&self) -> AuthStatus {
        let Some(credential) = self.core.stored_credential() else {
            debug!("No stored credential");
            self.core.settle_anonymous();
            return self.status();
        };

        let epoch = self.core.begin_restore(credential.clone());

        let result = match self.current_user_request(&credential) {
            Ok(request) => self.gateway.send::<UserProfile>(request).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(user) => {
                let id = user.id.clone();
                if self.core.finish_restore(epoch, &credential, user) {
                    info!(user = %id, "Session restored");
                    AuthStatus::Authenticated
                } else {
                    debug!("Session changed while revalidating, dropping bootstrap result");
                    self.status()
                }
            }
            Err(e) => {
                if self.core.discard(&credential) {
                    warn!(error = %e, "Stored credential could not be validated, discarding it");
                } else {
                    debug!(error = %e, "Credential no longer active, ignoring bootstrap error");
                }
                self.status()
            }
        }
    }

    /// Authenticate and establish a session. State is unchanged on failure.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserProfile, ApiError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::Validation("Username and password required".to_string()));
        }

        let attempt = match self.gateway.scheme() {
            AuthScheme::Bearer => self.login_bearer(username, password).await,
            AuthScheme::Basic => self.login_basic(username, password).await,
        };

        let (credential, user) = attempt.map_err(|e| {
            warn!(error = %e, "Login failed");
            match e.status() {
                Some(400 | 404) => ApiError::Authentication(
                    INVALID_CREDENTIALS_MESSAGE.to_string(),
                ),
                _ => e,
            }
        })?;

        self.core.establish(credential, user.clone());
        info!(user = %user.id, "Login successful");
        Ok(user)
    }

    async fn login_bearer(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Credential, UserProfile), ApiError> {
        let request = ApiRequest::post(&self.endpoints.login)
            .json(&LoginRequest { username, password })?
            .anonymous();
        let response: LoginResponse = self.gateway.send(request).await.map_err(invalid_credentials)?;

        let credential = Credential::issued(response.token);
        if credential.is_blank() {
            return Err(ApiError::malformed_response());
        }
        Ok((credential, response.user))
    }

    async fn login_basic(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(Credential, UserProfile), ApiError> {
        let credential = Credential::basic(username, password);
        let request = ApiRequest::get(self.endpoints.basic_login_path(username))
            .with_credential(credential.clone());
        let user: UserProfile = self.gateway.send(request).await.map_err(invalid_credentials)?;
        Ok((credential, user))
    }

    /// Create an account. Never establishes a session; the caller logs in next.
    ///
    /// Returns the created profile when the backend echoes one.
    pub async fn register(&self, form: &RegistrationForm) -> Result<Option<UserProfile>, ApiError> {
        form.validate()?;

        let request = ApiRequest::post(&self.endpoints.register)
            .json(&form.payload())?
            .anonymous();
        let body: serde_json::Value = self.gateway.send(request).await?;

        let candidate = body.get("user").cloned().unwrap_or(body);
        let profile = serde_json::from_value::<UserProfile>(candidate).ok();
        info!(username = %form.username.trim(), "Account created");
        Ok(profile)
    }

    /// Clear the credential and the user. Idempotent.
    pub fn logout(&self) {
        let was_authenticated = self.is_authenticated();
        self.core.clear();
        if was_authenticated {
            info!("Logged out");
        }
    }

    /// Replace the session's user with a server-confirmed profile. Ignored while
    /// anonymous, since an unvalidated session must not gain a user.
    pub fn update_user(&self, user: UserProfile) {
        let applied = self.core.state.send_if_modified(|state| {
            if state.user.is_none() || state.user.as_ref() == Some(&user) {
                return false;
            }
            state.user = Some(user.clone());
            true
        });
        if !self.is_authenticated() {
            warn!("Ignoring profile update without an authenticated session");
            return;
        }
        if applied {
            debug!(user = %user.id, "Session profile updated");
        }
        self.core.save_profile_snapshot(&user);
    }
}

/// Login rejections are reported as bad credentials, never with backend text.
fn invalid_credentials(e: ApiError) -> ApiError {
    if e.kind() == ErrorKind::Authentication {
        ApiError::Authentication(INVALID_CREDENTIALS_MESSAGE.to_string())
    } else {
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryStore;

    fn manager(url: &str, store: Arc<MemoryStore>) -> SessionManager {
        SessionManager::new(&Config::with_api_url(url), store).unwrap()
    }

    fn alice() -> UserProfile {
        serde_json::from_str(r#"{"id":1,"name":"Alice"}"#).unwrap()
    }

    #[test]
    fn test_initial_state_is_loading() {
        let session = manager("http://localhost:1", Arc::new(MemoryStore::new()));
        assert_eq!(session.status(), AuthStatus::Loading);
        assert!(session.current_user().is_none());
    }

    #[test]
    fn test_logout_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let session = manager("http://localhost:1", store.clone());

        session.logout();
        session.logout();
        assert_eq!(session.status(), AuthStatus::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_update_user_requires_session() {
        let store = Arc::new(MemoryStore::new());
        let session = manager("http://localhost:1", store.clone());
        session.logout();

        session.update_user(alice());
        assert!(session.current_user().is_none());
        assert_eq!(store.get(PROFILE_KEY).unwrap(), None);
    }

    #[test]
    fn test_update_user_replaces_profile() {
        let store = Arc::new(MemoryStore::new());
        let session = manager("http://localhost:1", store.clone());
        session.core.establish(Credential::issued("tok1"), alice());

        let mut rx = session.subscribe();
        let mut renamed = alice();
        renamed.name = Some("Alice Liddell".to_string());
        session.update_user(renamed.clone());

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().user.as_ref(), Some(&renamed));
        assert_eq!(session.cached_profile().unwrap().data, renamed);
    }

    #[test]
    fn test_rejecting_superseded_credential_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let session = manager("http://localhost:1", store.clone());
        session.core.establish(Credential::issued("new-tok"), alice());

        session.core.reject(&Credential::restored("old-tok"));
        assert!(session.is_authenticated());
        assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("new-tok"));

        session.core.reject(&Credential::restored("new-tok"));
        assert_eq!(session.status(), AuthStatus::Anonymous);
        assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
        assert!(session.cached_profile().is_none());
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let session = manager("http://localhost:1", Arc::new(MemoryStore::new()));
        let err = session.login("  ", "pw").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = session.login("alice", "").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
