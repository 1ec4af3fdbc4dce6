//! API client for the ticket support backend.
//!
//! This module provides the `TicketClient` struct for listing, creating and
//! updating tickets through the authenticated gateway, plus the public
//! registration endpoint.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::auth::SessionManager;
use crate::models::{NewTicket, Registration, StatusUpdate, Ticket, TicketStatus};

use super::gateway::Gateway;
use super::transport::{ApiRequest, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Ticket collection endpoint
const TICKETS_PATH: &str = "api/tickets/";

/// Account registration endpoint (public)
const REGISTER_PATH: &str = "register/";

fn ticket_path(id: u64) -> String {
    format!("{}{}/", TICKETS_PATH, id)
}

fn send_email_path(id: u64) -> String {
    format!("{}{}/send-email/", TICKETS_PATH, id)
}

#[derive(Debug, Deserialize)]
struct EmailResponse {
    success: Option<String>,
}

/// Ticket API client.
/// Clone is cheap - the gateway only holds shared handles.
#[derive(Clone)]
pub struct TicketClient {
    gateway: Gateway,
}

impl TicketClient {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self {
            gateway: Gateway::new(transport, session),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        self.gateway.session()
    }

    // ===== Accounts =====

    /// Create an account. Does not log in; the caller follows up with `login`.
    pub async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
        let request = ApiRequest::post(REGISTER_PATH).json(registration)?;
        // Public endpoint: no bearer token, no refresh
        self.session()
            .transport()
            .send(&request, None)
            .await?
            .error_for_status()?;
        info!(username = %registration.username, role = %registration.role, "Account registered");
        Ok(())
    }

    // ===== Tickets =====

    /// Customers see their own tickets, agents see every ticket
    pub async fn list_tickets(&self) -> Result<Vec<Ticket>, ApiError> {
        let tickets: Vec<Ticket> = self.gateway.execute_json(&ApiRequest::get(TICKETS_PATH)).await?;
        debug!(count = tickets.len(), "Fetched tickets");
        Ok(tickets)
    }

    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<Ticket, ApiError> {
        if ticket.title.trim().is_empty() {
            return Err(ApiError::Validation("Title is required".to_string()));
        }
        if ticket.description.trim().is_empty() {
            return Err(ApiError::Validation("Description is required".to_string()));
        }

        let request = ApiRequest::post(TICKETS_PATH).json(ticket)?;
        let created: Ticket = self.gateway.execute_json(&request).await?;
        info!(id = created.id, "Ticket created");
        Ok(created)
    }

    pub async fn update_status(&self, id: u64, status: TicketStatus) -> Result<Ticket, ApiError> {
        if status == TicketStatus::Unknown {
            return Err(ApiError::Validation(
                "Status must be open, in_progress or resolved".to_string(),
            ));
        }

        let request = ApiRequest::patch(ticket_path(id)).json(&StatusUpdate { status })?;
        let updated: Ticket = self.gateway.execute_json(&request).await?;
        info!(id, status = status.as_str(), "Ticket status updated");
        Ok(updated)
    }

    /// Ask the backend to email the ticket's customer its current status
    pub async fn send_email(&self, id: u64) -> Result<String, ApiError> {
        let request = ApiRequest::post(send_email_path(id)).json(&serde_json::json!({}))?;
        let response: EmailResponse = self.gateway.execute_json(&request).await?;
        info!(id, "Status email sent");
        Ok(response
            .success
            .unwrap_or_else(|| "Email sent successfully.".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::transport::testing::ScriptedTransport;
    use crate::auth::MemoryStorage;
    use crate::models::Role;

    async fn client() -> (Arc<ScriptedTransport>, TicketClient) {
        let transport = Arc::new(ScriptedTransport::new());
        let session = Arc::new(SessionManager::new(transport.clone(), Arc::new(MemoryStorage::new())));
        transport.reply(200, r#"{"access": "A1", "refresh": "R1", "is_agent": true}"#);
        session.login("agent@desk.io", "pw").await.unwrap();
        (transport.clone(), TicketClient::new(transport, session))
    }

    #[test]
    fn test_paths() {
        assert_eq!(ticket_path(12), "api/tickets/12/");
        assert_eq!(send_email_path(12), "api/tickets/12/send-email/");
    }

    #[tokio::test]
    async fn test_list_tickets() {
        let (transport, client) = client().await;
        transport.reply(200, r#"[{"id": 1, "title": "Printer", "status": "open", "customer": {"username": "c", "email": "c@x.io"}}]"#);

        let tickets = client.list_tickets().await.unwrap();
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].customer_email(), "c@x.io");

        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.method, reqwest::Method::GET);
        assert_eq!(sent.bearer.as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_create_ticket_sends_body() {
        let (transport, client) = client().await;
        transport.reply(201, r#"{"id": 5, "title": "Laptop", "description": "Won't boot", "status": "open"}"#);

        let created = client.create_ticket(&NewTicket::new("Laptop", "Won't boot")).await.unwrap();
        assert_eq!(created.id, 5);

        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.path, TICKETS_PATH);
        assert_eq!(
            sent.body.unwrap(),
            serde_json::json!({"title": "Laptop", "description": "Won't boot"})
        );
    }

    #[tokio::test]
    async fn test_create_ticket_requires_fields() {
        let (transport, client) = client().await;

        let err = client.create_ticket(&NewTicket::new("  ", "text")).await.unwrap_err();
        assert_eq!(err, ApiError::Validation("Title is required".to_string()));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_update_status() {
        let (transport, client) = client().await;
        transport.reply(200, r#"{"id": 5, "title": "Laptop", "status": "resolved"}"#);

        let updated = client.update_status(5, TicketStatus::Resolved).await.unwrap();
        assert_eq!(updated.status, TicketStatus::Resolved);

        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.method, reqwest::Method::PATCH);
        assert_eq!(sent.path, "api/tickets/5/");
        assert_eq!(sent.body.unwrap()["status"], "resolved");

        assert!(client.update_status(5, TicketStatus::Unknown).await.is_err());
    }

    #[tokio::test]
    async fn test_send_email_reports_server_failure() {
        let (transport, client) = client().await;
        transport
            .reply(200, r#"{"success": "Email sent successfully."}"#)
            .reply(500, r#"{"error": "SMTP unavailable"}"#);

        assert_eq!(client.send_email(5).await.unwrap(), "Email sent successfully.");
        assert_eq!(
            client.send_email(5).await.unwrap_err(),
            ApiError::ServerError("SMTP unavailable".to_string())
        );
    }

    #[tokio::test]
    async fn test_register_is_public_and_surfaces_validation() {
        let (transport, client) = client().await;
        transport
            .reply(201, r#"{"access": "x", "refresh": "y"}"#)
            .reply(400, r#"{"username": ["A user with that username already exists."]}"#);

        let registration = Registration {
            username: "casey".into(),
            email: "casey@example.com".into(),
            password: "pw".into(),
            role: Role::Customer,
        };
        client.register(&registration).await.unwrap();
        let sent = transport.requests().pop().unwrap();
        assert_eq!(sent.path, REGISTER_PATH);
        assert_eq!(sent.bearer, None);

        let err = client.register(&registration).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Validation("username: A user with that username already exists.".to_string())
        );
        // Registration never replaces the current session
        assert_eq!(client.session().access_token().await.as_deref(), Some("A1"));
    }
}
