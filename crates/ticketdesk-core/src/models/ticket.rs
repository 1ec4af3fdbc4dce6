use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    /// Any status this client does not know about
    #[serde(other)]
    Unknown,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 3] = [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::Resolved];

    /// Value sent over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "Open"),
            TicketStatus::InProgress => write!(f, "In Progress"),
            TicketStatus::Resolved => write!(f, "Resolved"),
            TicketStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    /// Accepts the wire value or the display label, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown ticket status '{}' (expected open, in_progress or resolved)", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TicketStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub customer: Option<UserSummary>,
    #[serde(default)]
    pub assigned_to: Option<UserSummary>,
}

impl Ticket {
    pub fn customer_email(&self) -> &str {
        self.customer
            .as_ref()
            .map(|c| c.email.as_str())
            .filter(|e| !e.is_empty())
            .unwrap_or("N/A")
    }
}

/// Body of a ticket creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
}

impl NewTicket {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Body of a status change request
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusUpdate {
    pub status: TicketStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ticket_list() {
        let json = r#"[
            {"id": 3, "title": "VPN down", "description": "Cannot connect", "status": "in_progress",
             "created_at": "2025-03-01T09:15:00.123456Z", "updated_at": "2025-03-02T10:00:00Z",
             "customer": {"id": 7, "username": "casey", "email": "casey@example.com"},
             "assigned_to": null},
            {"id": 4, "title": "Minimal", "status": "open"}
        ]"#;

        let tickets: Vec<Ticket> = serde_json::from_str(json).expect("Failed to parse tickets test JSON");
        assert_eq!(tickets.len(), 2);

        let t = &tickets[0];
        assert_eq!(t.status, TicketStatus::InProgress);
        assert_eq!(t.customer_email(), "casey@example.com");
        assert!(t.created_at.is_some());
        assert!(t.assigned_to.is_none());

        assert_eq!(tickets[1].customer_email(), "N/A");
        assert_eq!(tickets[1].description, None);
    }

    #[test]
    fn test_unknown_status_does_not_fail_decoding() {
        let ticket: Ticket =
            serde_json::from_str(r#"{"id": 1, "title": "x", "status": "escalated"}"#).unwrap();
        assert_eq!(ticket.status, TicketStatus::Unknown);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("open".parse::<TicketStatus>(), Ok(TicketStatus::Open));
        assert_eq!("In Progress".parse::<TicketStatus>(), Ok(TicketStatus::InProgress));
        assert_eq!("in-progress".parse::<TicketStatus>(), Ok(TicketStatus::InProgress));
        assert_eq!("RESOLVED".parse::<TicketStatus>(), Ok(TicketStatus::Resolved));
        assert!("unknown".parse::<TicketStatus>().is_err());
        assert!("closed".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_status_update_serializes_wire_value() {
        let body = serde_json::to_value(StatusUpdate {
            status: TicketStatus::InProgress,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"status": "in_progress"}));
    }
}
