//! Leadline - chat lead dashboard
//!
//! Command-line front end over the local CRM database: conversations,
//! sending, message statistics and the lead board.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use crm::{CrmError, LeadStatus, SendOutcome, Settings};
use log::error;

mod app;
mod views;

use app::{ContactEdit, Dashboard};

/// Chat lead dashboard
#[derive(Parser, Debug)]
#[command(name = "leadline")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Signed-in user id
    #[arg(short, long, global = true, default_value = "default")]
    user: String,

    /// Database path (overrides settings)
    #[arg(long, global = true)]
    db: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the current settings to the settings file
    Init,
    /// Show or update the user profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// List conversations
    Threads {
        /// Most recently active first
        #[arg(short, long)]
        recent: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show a conversation with its contact
    Show { counterparty: String },
    /// Send a message
    Send {
        counterparty: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Retry delivery of a message
    Retry { message_id: i64 },
    /// Message statistics
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Lead board
    Board {
        #[arg(long)]
        json: bool,
    },
    /// Move a lead to another stage
    Move {
        contact_id: String,
        /// new, contacted, qualified, proposal, won or lost
        status: LeadStatus,
    },
    /// Show or edit the contact for a counterparty
    Contact {
        counterparty: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        status: Option<LeadStatus>,
        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    Show,
    Set {
        /// Account phone number; empty clears it
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

fn print_outcome(outcome: &SendOutcome) {
    match &outcome.error {
        None => println!("Message {} delivered", outcome.record.id),
        Some(e) => {
            println!("Message {} failed: {}", outcome.record.id, e);
            println!("Retry with: leadline retry {}", outcome.record.id);
        }
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::load()?;
    if let Command::Init = args.command {
        let path = settings.save()?;
        println!("Settings written to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(db) = args.db {
        settings.database_path = Some(db);
    }
    let dashboard = Dashboard::open(&settings, args.user)?;

    let output = match args.command {
        Command::Init => unreachable!("handled before opening the database"),
        Command::Profile { action } => match action {
            ProfileAction::Show => dashboard.show_profile()?,
            ProfileAction::Set { phone, name, email } => {
                dashboard.set_profile(phone, name, email)?
            }
        },
        Command::Threads { recent, json } => dashboard.threads(recent, json)?,
        Command::Show { counterparty } => dashboard.show_thread(&counterparty)?,
        Command::Send { counterparty, text } => {
            let outcome = dashboard.send(&counterparty, &text.join(" "))?;
            print_outcome(&outcome);
            return Ok(if outcome.delivered() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Command::Retry { message_id } => {
            let outcome = dashboard.retry(message_id)?;
            print_outcome(&outcome);
            return Ok(if outcome.delivered() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            });
        }
        Command::Stats { json } => dashboard.stats(json)?,
        Command::Board { json } => dashboard.board(json)?,
        Command::Move { contact_id, status } => dashboard.move_lead(&contact_id, status)?,
        Command::Contact {
            counterparty,
            name,
            email,
            status,
            notes,
        } => dashboard.contact(
            &counterparty,
            ContactEdit {
                name,
                email,
                status,
                notes,
            },
        )?,
    };

    print!("{output}");
    if !output.ends_with('\n') {
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            if let Some(CrmError::MissingPhoneNumber { .. }) = e.downcast_ref::<CrmError>() {
                eprintln!("{e}");
                eprintln!("Set one with: leadline profile set --phone <number>");
            } else {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
