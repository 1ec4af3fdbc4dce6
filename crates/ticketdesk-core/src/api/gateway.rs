//! Authenticated request gateway.
//!
//! Every authenticated call goes through [`Gateway::execute`]: the current
//! access token is attached, and a `401 Unauthorized` triggers one refresh
//! followed by one replay of the same request. A replayed request that is
//! rejected again is returned as-is.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::SessionManager;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

/// A request together with whether it has already been replayed.
#[derive(Debug, Clone, Copy)]
struct Attempt<'a> {
    request: &'a ApiRequest,
    retried: bool,
}

impl<'a> Attempt<'a> {
    fn first(request: &'a ApiRequest) -> Self {
        Self {
            request,
            retried: false,
        }
    }

    fn replay(self) -> Self {
        Self {
            retried: true,
            ..self
        }
    }
}

/// Clone is cheap - both fields are shared handles.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Dispatch `request` with the session's token, healing one expired token.
    ///
    /// Returns the final response whatever its status; transport failures and
    /// refresh failures are errors.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut attempt = Attempt::first(request);
        let mut token = self.session.access_token().await;

        loop {
            let response = self.transport.send(attempt.request, token.as_deref()).await?;
            if !response.is_unauthorized() || attempt.retried {
                return Ok(response);
            }

            attempt = attempt.replay();
            debug!(method = %request.method, path = %request.path, "Unauthorized, refreshing access token");
            token = Some(self.session.refresh_after(token.as_deref()).await?);
        }
    }

    /// Execute and require a success status
    pub async fn execute_checked(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.execute(request).await?.error_for_status()
    }

    /// Execute, require success, and decode the JSON body
    pub async fn execute_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        self.execute_checked(request).await?.json()
    }
}
