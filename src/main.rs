use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use room_booking::config::Config;
use room_booking::retention::RetentionPolicy;
use room_booking::session::SessionStore;
use room_booking::types::BookingUpdate;
use room_booking::{BookingDraft, BookingService, ClockTime, HttpBackend, Priority, Role};

#[derive(Parser, Debug)]
#[command(name = "roombook")]
#[command(author, version, about = "Book meeting rooms and review requests", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "roombook.toml")]
    config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in and keep the session for later commands
    Login { email: String, password: String },

    /// Create an account and log in
    Register {
        email: String,
        name: String,
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// List rooms
    Rooms,

    /// List bookings
    Bookings {
        /// Only bookings you own
        #[arg(long)]
        mine: bool,
    },

    /// Request a room
    Book {
        #[arg(long)]
        room: String,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        start: ClockTime,
        #[arg(long)]
        end: ClockTime,
        #[arg(long)]
        title: String,
        #[arg(long, default_value_t = 1)]
        attendees: u32,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "Medium")]
        priority: Priority,
        /// Repeat for each item
        #[arg(long)]
        equipment: Vec<String>,
        /// Submit even if the slot is taken, for an admin to arbitrate
        #[arg(long)]
        r#override: bool,
    },

    /// Change a pending booking you own
    Edit {
        id: String,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        start: Option<ClockTime>,
        #[arg(long)]
        end: Option<ClockTime>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        attendees: Option<u32>,
        #[arg(long)]
        priority: Option<Priority>,
    },

    /// Approve a pending booking (admin)
    Approve { id: String },

    /// Reject a pending booking (admin)
    Reject { id: String, reason: String },

    /// Cancel a booking
    Cancel {
        id: String,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Permanently delete a booking (admin)
    Delete { id: String },

    /// Pending requests that collide with approved bookings (admin)
    Collisions,

    /// Retention settings (admin)
    #[command(subcommand)]
    Cleanup(CleanupCommands),

    /// Account management (admin)
    #[command(subcommand)]
    Users(UserCommands),
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// Create an account with the given role
    Add {
        email: String,
        name: String,
        password: String,
        #[arg(long, default_value = "USER")]
        role: Role,
    },
}

#[derive(Subcommand, Debug)]
enum CleanupCommands {
    /// Show the current policy and the next scheduled run
    Status,
    /// Turn automatic cleanup on
    Enable,
    /// Turn automatic cleanup off
    Disable,
    /// Run cleanup immediately
    Run,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;

    let log_level = cli
        .log_level
        .as_ref()
        .unwrap_or(&config.logging.level)
        .clone();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    std::fs::create_dir_all(&config.session.dir).with_context(|| {
        format!(
            "Failed to create session directory: {}",
            config.session.dir.display()
        )
    })?;
    let store = SessionStore::open(&config.session.dir)?;
    let backend = HttpBackend::new(&config.api)?;
    let mut service = BookingService::new(backend, store);

    let command = match cli.command {
        Commands::Login { email, password } => {
            let user = service.login(&email, &password).await?;
            print_json(&user)?;
            return Ok(());
        }
        Commands::Register {
            email,
            name,
            password,
        } => {
            let user = service.register(&email, &name, &password).await?;
            print_json(&user)?;
            return Ok(());
        }
        Commands::Logout => {
            service.logout()?;
            return Ok(());
        }
        other => other,
    };

    if !service.restore_session().await? {
        anyhow::bail!("Not logged in, run `roombook login` first");
    }

    match command {
        Commands::Login { .. } | Commands::Register { .. } | Commands::Logout => {}
        Commands::Rooms => print_json(service.rooms())?,
        Commands::Bookings { mine } => {
            if mine {
                print_json(&service.my_bookings())?
            } else {
                print_json(service.bookings())?
            }
        }
        Commands::Book {
            room,
            date,
            start,
            end,
            title,
            attendees,
            description,
            priority,
            equipment,
            r#override,
        } => {
            let draft = equipment.iter().fold(
                BookingDraft::new()
                    .set_room(&room)
                    .set_date(date)
                    .set_start_time(start)
                    .set_end_time(end)
                    .set_title(&title)
                    .set_attendees(attendees)
                    .set_description(&description)
                    .set_priority(priority),
                |draft, item| draft.add_equipment(item),
            );
            let booking = if r#override {
                service.request_override(draft).await?
            } else {
                service.create_booking(draft).await?
            };
            print_json(&booking)?;
        }
        Commands::Edit {
            id,
            date,
            start,
            end,
            title,
            attendees,
            priority,
        } => {
            let update = BookingUpdate {
                date,
                start_time: start,
                end_time: end,
                title,
                attendees,
                priority,
                ..BookingUpdate::default()
            };
            print_json(&service.update_booking(&id, update).await?)?;
        }
        Commands::Approve { id } => {
            if let Some(occupant) = service.conflict_for(&id)? {
                eprintln!(
                    "warning: overlaps approved booking {} held by {}; cancel it separately",
                    occupant.id, occupant.user_name
                );
            }
            print_json(&service.approve(&id).await?)?;
        }
        Commands::Reject { id, reason } => print_json(&service.reject(&id, &reason).await?)?,
        Commands::Cancel { id, notes } => {
            print_json(&service.cancel(&id, notes.as_deref()).await?)?
        }
        Commands::Delete { id } => service.delete_booking(&id).await?,
        Commands::Collisions => {
            for (pending, occupant) in service.collisions()? {
                println!(
                    "{} ({} {}-{}) collides with {} held by {}",
                    pending.id,
                    pending.date,
                    pending.start_time,
                    pending.end_time,
                    occupant.id,
                    occupant.user_name
                );
            }
        }
        Commands::Cleanup(command) => match command {
            CleanupCommands::Status => {
                let status = service.cleanup_status().await?;
                let next_run = RetentionPolicy::from(&status).next_run_after(Utc::now());
                print_json(&status)?;
                println!("next run: {next_run}");
            }
            CleanupCommands::Enable => {
                service.toggle_cleanup(true).await?;
            }
            CleanupCommands::Disable => {
                service.toggle_cleanup(false).await?;
            }
            CleanupCommands::Run => print_json(&service.run_cleanup_now().await?)?,
        },
        Commands::Users(UserCommands::Add {
            email,
            name,
            password,
            role,
        }) => print_json(&service.create_user(&email, &name, &password, role).await?)?,
    }

    Ok(())
}
