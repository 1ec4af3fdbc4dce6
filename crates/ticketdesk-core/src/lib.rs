//! Client library for a ticket support backend.
//!
//! [`auth::SessionManager`] owns the access/refresh token pair and the
//! logged-in identity. [`api::TicketClient`] issues ticket calls through the
//! [`api::Gateway`], which retries a request once after refreshing an expired
//! access token.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use api::{HttpTransport, TicketClient, Transport};
use auth::{FileStorage, KeyringStorage, SessionManager, SessionStorage};
use config::{Config, StorageBackend};

/// Wire up transport, storage, session and client from configuration.
///
/// The persisted session is not restored here; call
/// `SessionManager::restore_from_storage` once at startup.
pub fn connect(config: &Config) -> Result<TicketClient> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(
        &config.base_url,
        Duration::from_secs(config.request_timeout_secs),
    )?);

    let storage: Arc<dyn SessionStorage> = match config.storage {
        StorageBackend::File => Arc::new(FileStorage::new(config.cache_dir()?)),
        StorageBackend::Keyring => Arc::new(KeyringStorage::new()),
    };

    let session = Arc::new(SessionManager::new(transport.clone(), storage));
    Ok(TicketClient::new(transport, session))
}
