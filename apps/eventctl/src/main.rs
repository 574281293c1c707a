use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{EventStateController, HttpEventApi, SnapshotCache};
use shared::domain::{Attendee, AttendeeAction, AttendeeId, EventId, SessionId};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod cache;
mod render;
mod settings;

use cache::FileSnapshotCache;
use settings::{load_settings, DEFAULT_SETTINGS_FILE};

#[derive(Parser, Debug)]
#[command(about = "Inspect and edit one event served by the Event API")]
struct Args {
    /// Event to operate on.
    #[arg(long, env = "EVENTCTL_EVENT_ID")]
    event: String,
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    /// Overrides the API base url from settings and environment.
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Skip reading and writing the local snapshot cache.
    #[arg(long)]
    no_cache: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the event with all sessions and attendees.
    Show,
    /// Sessions starting exactly at the given timestamp.
    Sessions {
        #[arg(long)]
        start: String,
    },
    /// Attendees whose name contains the query (case-insensitive).
    Attendees {
        #[arg(long, default_value = "")]
        search: String,
    },
    Reschedule {
        session_id: String,
        start: String,
        end: String,
    },
    /// Add or remove one attendee, then refetch the event.
    ManageAttendee {
        /// `add` or `remove`.
        action: AttendeeAction,
        /// Required for `remove`; `add` defaults to a freshly generated id.
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
}

/// Builds the record `manage_attendee_list` needs for `action`.
fn attendee_for(
    action: AttendeeAction,
    id: Option<String>,
    name: Option<String>,
    email: Option<String>,
) -> Result<Attendee> {
    match action {
        AttendeeAction::Add => {
            let name = name.ok_or_else(|| anyhow!("--name is required to add an attendee"))?;
            let email = email.ok_or_else(|| anyhow!("--email is required to add an attendee"))?;
            let id = id.map(AttendeeId::from).unwrap_or_else(AttendeeId::generate);
            Ok(Attendee::new(id, name, email))
        }
        AttendeeAction::Remove => {
            let id = id.ok_or_else(|| anyhow!("--id is required to remove an attendee"))?;
            Ok(Attendee::with_id(AttendeeId::from(id)))
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut settings = load_settings(&args.config);
    if let Some(api_url) = args.api_url {
        settings.api_url = api_url;
    }
    if let Some(timeout_secs) = args.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }
    let config = settings.api_config().context("invalid API settings")?;

    let cache = if args.no_cache {
        None
    } else {
        settings.resolved_cache_dir().map(FileSnapshotCache::new)
    };
    let event_id = EventId::from(args.event);

    if let (Command::Show, Some(cache)) = (&args.command, &cache) {
        match cache.load(&event_id) {
            Ok(Some(cached)) => print!("{}", render::details(&cached, true)),
            Ok(None) => debug!(event_id = %event_id, "no cached snapshot"),
            Err(err) => warn!(error = %format!("{err:#}"), "ignoring snapshot cache"),
        }
    }

    let api = HttpEventApi::new(config).context("failed to build HTTP client")?;
    let controller = EventStateController::open(Arc::new(api), event_id.clone()).await;

    match args.command {
        Command::Show => {
            if let Some(details) = controller.details() {
                print!("{}", render::details(&details, false));
            }
        }
        Command::Sessions { start } => {
            print!("{}", render::sessions(&controller.filter_sessions_by_time(&start)));
        }
        Command::Attendees { search } => {
            print!(
                "{}",
                render::attendees(&controller.search_attendees_by_name(&search))
            );
        }
        Command::Reschedule {
            session_id,
            start,
            end,
        } => {
            let _ = controller
                .update_session_times(&SessionId::from(session_id), &start, &end)
                .await;
        }
        Command::ManageAttendee {
            action,
            id,
            name,
            email,
        } => {
            let attendee = attendee_for(action, id, name, email)?;
            let _ = controller.manage_attendee_list(action, &attendee).await;
        }
    }

    let state = controller.state();
    if let (Some(cache), Some(details)) = (&cache, &state.details) {
        if let Err(err) = cache.store(&event_id, details) {
            warn!(error = %format!("{err:#}"), "failed to update snapshot cache");
        }
    }
    eprintln!("{}", render::status(&state));

    match state.error {
        Some(error) => Err(anyhow!(error)),
        None => Ok(()),
    }
}
