//! REST API client module for the ticket support backend.
//!
//! This module provides the `TicketClient` for ticket operations, the
//! `Gateway` that attaches bearer tokens and heals a single expired token,
//! and the `Transport` seam that actually moves bytes (`reqwest` in
//! production).
//!
//! The API uses JWT bearer token authentication obtained through the
//! `api/token/` endpoint; see `crate::auth`.

pub mod client;
pub mod error;
pub mod gateway;
pub mod transport;

pub use client::TicketClient;
pub use error::ApiError;
pub use gateway::Gateway;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
