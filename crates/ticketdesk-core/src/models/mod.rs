//! Data models for the ticket support backend.
//!
//! - `Ticket`, `TicketStatus`, `UserSummary`: tickets as returned by the API
//! - `NewTicket`, `StatusUpdate`: request bodies for ticket changes
//! - `Registration`, `Role`: account creation

pub mod account;
pub mod ticket;

pub use account::{Registration, Role};
pub use ticket::{NewTicket, StatusUpdate, Ticket, TicketStatus, UserSummary};
