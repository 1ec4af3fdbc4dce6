//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: login, logout, token refresh and startup restore
//! - `SessionStorage`: where the credential pair and identity are persisted
//!   (JSON file, OS keychain, or memory)
//!
//! Access tokens are short-lived; the refresh token mints new ones until it
//! is itself rejected, at which point the session ends.

pub mod session;
pub mod storage;

pub use session::{CredentialPair, Identity, SessionManager, SessionState};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage};
