//! Application state for the ticketdesk CLI.
//!
//! `App` ties the configuration, the session manager and the ticket client
//! together and turns library errors into one-line messages for the user.

use std::io::{self, Write};

use anyhow::Result;
use tracing::{debug, error, warn};

use ticketdesk_core::api::{ApiError, TicketClient};
use ticketdesk_core::auth::Identity;
use ticketdesk_core::config::Config;
use ticketdesk_core::models::{NewTicket, Registration, Role, Ticket, TicketStatus};

/// Login identifier from the environment, ahead of the remembered one
const EMAIL_ENV: &str = "TICKETDESK_EMAIL";

/// Password from the environment, skipping the prompt
const PASSWORD_ENV: &str = "TICKETDESK_PASSWORD";

pub struct App {
    pub config: Config,
    pub client: TicketClient,
}

impl App {
    /// Build the client and restore any persisted session
    pub async fn new(config: Config) -> Result<Self> {
        let client = ticketdesk_core::connect(&config)?;

        match client.session().restore_from_storage().await {
            Ok(true) => debug!("Session restored"),
            Ok(false) => debug!("No saved session"),
            Err(e) => {
                warn!(error = %e, "Saved session unreadable, starting anonymous");
                client.session().logout().await;
            }
        }

        Ok(Self { config, client })
    }

    pub async fn identity(&self) -> Option<Identity> {
        self.client.session().identity().await
    }

    /// The logged-in identity, or an error telling the user to log in
    async fn require_identity(&self) -> Result<Identity> {
        self.identity()
            .await
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `ticketdesk login` first."))
    }

    // ===== Session =====

    pub async fn login(&mut self, email: Option<String>) -> Result<Identity> {
        let email = match email
            .or_else(|| std::env::var(EMAIL_ENV).ok())
            .or_else(|| self.config.last_email.clone())
        {
            Some(email) if !email.trim().is_empty() => email.trim().to_string(),
            _ => Self::prompt_line("Email: ")?,
        };
        let password = Self::password()?;

        let identity = self
            .client
            .session()
            .login(&email, &password)
            .await
            .map_err(|e| Self::user_error("Login failed", e))?;

        self.remember_email(&email);
        Ok(identity)
    }

    pub async fn logout(&self) {
        self.client.session().logout().await;
    }

    /// Create an account, then log in with it
    pub async fn register(&mut self, username: String, email: String, role: Role) -> Result<Identity> {
        let password = Self::password()?;
        let registration = Registration {
            username,
            email: email.clone(),
            password: password.clone(),
            role,
        };

        self.client
            .register(&registration)
            .await
            .map_err(|e| Self::user_error("Registration failed", e))?;

        let identity = self
            .client
            .session()
            .login(&email, &password)
            .await
            .map_err(|e| Self::user_error("Login failed", e))?;

        self.remember_email(&email);
        Ok(identity)
    }

    fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }

    // ===== Tickets =====

    /// Tickets plus whether the viewer is an agent
    pub async fn tickets(&self) -> Result<(Vec<Ticket>, bool)> {
        let identity = self.require_identity().await?;
        let tickets = self
            .client
            .list_tickets()
            .await
            .map_err(|e| Self::user_error("Failed to load tickets", e))?;
        Ok((tickets, identity.is_agent))
    }

    pub async fn create_ticket(&self, title: String, description: String) -> Result<Ticket> {
        self.require_identity().await?;
        self.client
            .create_ticket(&NewTicket::new(title, description))
            .await
            .map_err(|e| Self::user_error("Failed to create ticket", e))
    }

    pub async fn update_status(&self, id: u64, status: TicketStatus) -> Result<Ticket> {
        self.require_identity().await?;
        self.client
            .update_status(id, status)
            .await
            .map_err(|e| Self::user_error("Failed to update ticket status", e))
    }

    pub async fn send_email(&self, id: u64) -> Result<String> {
        self.require_identity().await?;
        self.client
            .send_email(id)
            .await
            .map_err(|e| Self::user_error("Failed to send email", e))
    }

    // ===== Input =====

    fn prompt_line(prompt: &str) -> Result<String> {
        print!("{}", prompt);
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }

    fn password() -> Result<String> {
        match std::env::var(PASSWORD_ENV) {
            Ok(password) if !password.is_empty() => Ok(password),
            _ => Ok(rpassword::prompt_password("Password: ")?),
        }
    }

    // ===== Errors =====

    /// Turn a library error into the message shown to the user
    pub fn user_message(context: &str, err: &ApiError) -> String {
        match err {
            ApiError::Auth(detail) if context.starts_with("Login") => detail.clone(),
            e if e.is_auth_error() => "Session expired. Please log in again.".to_string(),
            ApiError::Validation(detail) => detail.clone(),
            ApiError::Network(_) => "Unable to connect to server. Check your connection.".to_string(),
            ApiError::RateLimited => "Server is busy. Please wait a moment and try again.".to_string(),
            other => format!("{}: {}", context, other),
        }
    }

    fn user_error(context: &str, err: ApiError) -> anyhow::Error {
        error!(error = %err, "{}", context);
        anyhow::anyhow!(Self::user_message(context, &err))
    }
}
