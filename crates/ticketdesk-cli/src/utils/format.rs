use chrono::{DateTime, Utc};
use ticketdesk_core::models::Ticket;

/// Widest title shown in the ticket table
const TITLE_WIDTH: usize = 40;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a timestamp for display, or "-" when missing
pub fn format_date(date: Option<&DateTime<Utc>>) -> String {
    match date {
        Some(dt) => dt.format("%b %d, %Y").to_string(),
        None => "-".to_string(),
    }
}

/// Render tickets as a plain-text table.
/// Agents get a customer column since they see every customer's tickets.
pub fn render_tickets(tickets: &[Ticket], show_customer: bool) -> String {
    if tickets.is_empty() {
        return if show_customer {
            "No tickets assigned.".to_string()
        } else {
            "No tickets found.".to_string()
        };
    }

    let mut lines = Vec::with_capacity(tickets.len() + 1);
    let mut header = format!("{:>5}  {:<width$}  {:<12}  {:<12}", "ID", "TITLE", "STATUS", "CREATED", width = TITLE_WIDTH);
    if show_customer {
        header.push_str("  CUSTOMER");
    }
    lines.push(header);

    for ticket in tickets {
        let mut line = format!(
            "{:>5}  {:<width$}  {:<12}  {:<12}",
            ticket.id,
            truncate_string(&ticket.title, TITLE_WIDTH),
            ticket.status.to_string(),
            format_date(ticket.created_at.as_ref()),
            width = TITLE_WIDTH
        );
        if show_customer {
            line.push_str("  ");
            line.push_str(ticket.customer_email());
        }
        lines.push(line.trim_end().to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketdesk_core::models::TicketStatus;

    fn ticket(id: u64, title: &str) -> Ticket {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "status": "in_progress",
            "created_at": "2025-03-01T09:15:00Z",
            "customer": {"username": "casey", "email": "casey@example.com"}
        }))
        .unwrap()
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_format_date() {
        let t = ticket(1, "x");
        assert_eq!(format_date(t.created_at.as_ref()), "Mar 01, 2025");
        assert_eq!(format_date(None), "-");
    }

    #[test]
    fn test_render_tickets_customer_view() {
        let out = render_tickets(&[ticket(7, "VPN down")], false);
        assert!(out.contains("VPN down"));
        assert!(out.contains(&TicketStatus::InProgress.to_string()));
        assert!(!out.contains("casey@example.com"));
    }

    #[test]
    fn test_render_tickets_agent_view() {
        let out = render_tickets(&[ticket(7, "VPN down")], true);
        assert!(out.lines().next().unwrap().ends_with("CUSTOMER"));
        assert!(out.contains("casey@example.com"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_tickets(&[], false), "No tickets found.");
        assert_eq!(render_tickets(&[], true), "No tickets assigned.");
    }
}
