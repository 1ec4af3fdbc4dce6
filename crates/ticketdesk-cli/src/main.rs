//! TicketDesk - a command-line client for the ticket support backend.
//!
//! Customers file and track tickets; agents see every ticket, change its
//! status and email the customer. The session survives between runs.

mod app;
mod utils;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use ticketdesk_core::config::Config;
use ticketdesk_core::models::{Role, TicketStatus};
use utils::render_tickets;

#[derive(Parser)]
#[command(name = "ticketdesk", version, about = "Ticket support client")]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// End the current session
    Logout,
    /// Create an account and log in with it
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "customer")]
        role: Role,
    },
    /// Show who is logged in
    Whoami,
    /// List tickets (agents see all tickets)
    Tickets,
    /// File a new ticket
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
    },
    /// Change a ticket's status
    Status {
        id: u64,
        /// open, in_progress or resolved
        status: TicketStatus,
    },
    /// Email the customer the ticket's current status
    Email { id: u64 },
}

/// Initialize the tracing subscriber for logging
fn init_tracing(log_file: Option<&PathBuf>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(std::path::Path::new("."));
            let name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "ticketdesk.log".into());
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_ref());

    let config = Config::load()?;
    info!(base_url = %config.base_url, "ticketdesk starting");

    let mut app = App::new(config).await?;
    run(&mut app, cli.command).await
}

async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Login { email } => {
            let identity = app.login(email).await?;
            let role = if identity.is_agent { "agent" } else { "customer" };
            println!("Logged in as {} ({})", identity.email, role);
        }
        Command::Logout => {
            app.logout().await;
            println!("Logged out");
        }
        Command::Register { username, email, role } => {
            let identity = app.register(username, email, role).await?;
            println!("Registered and logged in as {} ({})", identity.email, role);
        }
        Command::Whoami => match app.identity().await {
            Some(identity) => {
                let role = if identity.is_agent { "agent" } else { "customer" };
                println!("{} <{}> ({})", identity.username, identity.email, role);
            }
            None => println!("Not logged in"),
        },
        Command::Tickets => {
            let (tickets, is_agent) = app.tickets().await?;
            println!("{}", render_tickets(&tickets, is_agent));
        }
        Command::Create { title, description } => {
            let ticket = app.create_ticket(title, description).await?;
            println!("Created ticket #{}: {}", ticket.id, ticket.title);
        }
        Command::Status { id, status } => {
            let ticket = app.update_status(id, status).await?;
            println!("Ticket #{} is now {}", ticket.id, ticket.status);
        }
        Command::Email { id } => {
            let message = app.send_email(id).await?;
            println!("{}", message);
        }
    }
    Ok(())
}
