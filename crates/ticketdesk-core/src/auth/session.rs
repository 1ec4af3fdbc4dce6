use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::api::transport::{bearer_header, ApiRequest, Transport};
use crate::api::ApiError;

use super::storage::SessionStorage;

// ============================================================================
// Constants
// ============================================================================

/// Obtain a token pair from an email/password
const TOKEN_PATH: &str = "api/token/";

/// Mint a new access token from a refresh token
const TOKEN_REFRESH_PATH: &str = "api/token/refresh/";

/// Persisted keys. Written on login, cleared together on logout.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
pub const IS_AGENT_KEY: &str = "isAgent";

const PERSISTED_KEYS: [&str; 4] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY, IS_AGENT_KEY];

// ============================================================================
// Session types
// ============================================================================

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub is_agent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated {
        credentials: CredentialPair,
        identity: Identity,
    },
}

impl SessionState {
    pub fn access_token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { credentials, .. } => Some(&credentials.access_token),
            SessionState::Anonymous => None,
        }
    }

    fn refresh_token(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { credentials, .. } => Some(&credentials.refresh_token),
            SessionState::Anonymous => None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    #[serde(default)]
    is_agent: bool,
    email: Option<String>,
    username: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: String,
    /// Present when the backend rotates refresh tokens
    refresh: Option<String>,
}

impl Identity {
    /// Build the identity from a login response, falling back to the login identifier.
    fn from_login(identifier: &str, email: Option<String>, username: Option<String>, is_agent: bool) -> Self {
        let email = email.filter(|e| !e.is_empty()).unwrap_or_else(|| identifier.to_string());
        let username = username.filter(|u| !u.is_empty()).unwrap_or_else(|| {
            identifier.split('@').next().unwrap_or(identifier).to_string()
        });
        Self {
            email,
            username,
            is_agent,
        }
    }
}

// ============================================================================
// Session manager
// ============================================================================

/// Owns the credential pair and identity for the whole process.
///
/// Shared as an `Arc<SessionManager>` handle. `login`, `logout`, `refresh` and
/// `restore_from_storage` are the only operations that change the session;
/// everything else reads the current access token when it builds a request.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn SessionStorage>,
    state: RwLock<SessionState>,
    // Held for the whole refresh exchange so concurrent 401s share one refresh
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            transport,
            storage,
            state: RwLock::new(SessionState::Anonymous),
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Snapshot of the current session
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token().map(str::to_string)
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.state.read().await.identity().cloned()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    /// The default `Authorization` header value, present while authenticated
    pub async fn authorization_header(&self) -> Option<String> {
        self.state.read().await.access_token().map(bearer_header)
    }

    /// Exchange an email/password for a token pair and make it the current session.
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<Identity, ApiError> {
        let request = ApiRequest::post(TOKEN_PATH).json(&LoginRequest {
            username: identifier,
            password: secret,
        })?;

        let response = self.transport.send(&request, None).await?;
        if !response.status.is_success() {
            let message = ApiError::server_message(&response.body);
            warn!(status = %response.status, "Login rejected");
            return Err(ApiError::Auth(message));
        }

        let login: LoginResponse = response.json()?;
        let identity = Identity::from_login(identifier, login.email, login.username, login.is_agent);
        let credentials = CredentialPair {
            access_token: login.access,
            refresh_token: login.refresh,
        };

        // Storage is written under the state lock so it always matches memory
        let mut state = self.state.write().await;
        self.persist_session(&credentials, &identity);
        *state = SessionState::Authenticated {
            credentials,
            identity: identity.clone(),
        };
        drop(state);

        info!(username = %identity.username, is_agent = identity.is_agent, "Logged in");
        Ok(identity)
    }

    /// Drop the session from memory and storage. Safe to call when already anonymous.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        let was_authenticated = std::mem::take(&mut *state).is_authenticated();
        self.clear_storage();
        drop(state);

        if was_authenticated {
            info!("Logged out");
        }
    }

    /// End the session only if it is still the one holding `refresh_token`.
    ///
    /// A login that completed while the refresh was in flight is left alone.
    async fn logout_if_current(&self, refresh_token: &str) -> bool {
        let mut state = self.state.write().await;
        if state.refresh_token() != Some(refresh_token) {
            return false;
        }
        *state = SessionState::Anonymous;
        self.clear_storage();
        drop(state);

        info!("Logged out");
        true
    }

    fn clear_storage(&self) {
        for key in PERSISTED_KEYS {
            if let Err(e) = self.storage.remove(key) {
                warn!(key, error = %e, "Failed to clear persisted session value");
            }
        }
    }

    /// Mint a new access token from the refresh token.
    ///
    /// Any failure ends the session that owned the refresh token before the
    /// error is returned.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Refresh on behalf of a request that was rejected while carrying `stale`.
    ///
    /// If another request already replaced `stale` while this one waited on the
    /// gate, the newer token is returned without contacting the server.
    pub async fn refresh_after(&self, stale: Option<&str>) -> Result<String, ApiError> {
        let _gate = self.refresh_gate.lock().await;

        if let Some(current) = self.access_token().await {
            if stale != Some(current.as_str()) {
                debug!("Access token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<String, ApiError> {
        let refresh_token = self.state.read().await.refresh_token().map(str::to_string);
        let Some(refresh_token) = refresh_token else {
            warn!("Refresh requested without a refresh token");
            self.logout().await;
            return Err(ApiError::MissingRefreshToken);
        };

        match self.request_access_token(&refresh_token).await {
            Ok(refreshed) => self.install_refreshed(&refresh_token, refreshed).await,
            Err(e) => {
                if self.logout_if_current(&refresh_token).await {
                    warn!(error = %e, "Token refresh failed, session ended");
                } else {
                    warn!(error = %e, "Token refresh failed for a session that was already replaced");
                }
                Err(e)
            }
        }
    }

    async fn request_access_token(&self, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
        let request = ApiRequest::post(TOKEN_REFRESH_PATH).json(&RefreshRequest {
            refresh: refresh_token,
        })?;

        debug!("Requesting new access token");
        let response = self.transport.send(&request, None).await?;
        if !response.status.is_success() {
            return Err(ApiError::Auth(ApiError::server_message(&response.body)));
        }
        response.json()
    }

    async fn install_refreshed(&self, used: &str, refreshed: RefreshResponse) -> Result<String, ApiError> {
        let mut state = self.state.write().await;
        let SessionState::Authenticated { credentials, .. } = &mut *state else {
            return Err(ApiError::Auth("Session ended during token refresh".to_string()));
        };
        if credentials.refresh_token != used {
            return Err(ApiError::Auth("Session replaced during token refresh".to_string()));
        }

        credentials.access_token = refreshed.access;
        if let Some(rotated) = refreshed.refresh {
            credentials.refresh_token = rotated;
            if let Err(e) = self.storage.set(REFRESH_TOKEN_KEY, &credentials.refresh_token) {
                warn!(error = %e, "Failed to persist rotated refresh token");
            }
        }
        if let Err(e) = self.storage.set(ACCESS_TOKEN_KEY, &credentials.access_token) {
            warn!(error = %e, "Failed to persist refreshed access token");
        }

        debug!("Access token refreshed");
        Ok(credentials.access_token.clone())
    }

    /// Rebuild the session from storage at startup. No network access.
    ///
    /// Returns whether a session was restored. Partially persisted state is
    /// treated as anonymous.
    pub async fn restore_from_storage(&self) -> anyhow::Result<bool> {
        let access = self.storage.get(ACCESS_TOKEN_KEY)?;
        let refresh = self.storage.get(REFRESH_TOKEN_KEY)?;
        let user = self.storage.get(USER_KEY)?;

        let (Some(access_token), Some(refresh_token), Some(user)) = (access, refresh, user) else {
            debug!("No persisted session found");
            return Ok(false);
        };

        let mut identity: Identity = serde_json::from_str(&user)
            .map_err(|e| anyhow::anyhow!("Failed to parse persisted user: {}", e))?;
        if let Some(flag) = self.storage.get(IS_AGENT_KEY)? {
            identity.is_agent = identity.is_agent || flag == "true";
        }

        info!(username = %identity.username, "Session restored from storage");
        *self.state.write().await = SessionState::Authenticated {
            credentials: CredentialPair {
                access_token,
                refresh_token,
            },
            identity,
        };
        Ok(true)
    }

    fn persist_session(&self, credentials: &CredentialPair, identity: &Identity) {
        let user = match serde_json::to_string(identity) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Failed to serialize identity");
                return;
            }
        };
        let values = [
            (ACCESS_TOKEN_KEY, credentials.access_token.as_str()),
            (REFRESH_TOKEN_KEY, credentials.refresh_token.as_str()),
            (USER_KEY, user.as_str()),
            (IS_AGENT_KEY, if identity.is_agent { "true" } else { "false" }),
        ];
        for (key, value) in values {
            if let Err(e) = self.storage.set(key, value) {
                warn!(key, error = %e, "Failed to persist session value");
            }
        }
    }
}
