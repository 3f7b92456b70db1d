use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use crate::config::Config;
use crate::graph::types::GraphEvent;
use crate::graph::GraphClient;

use super::output::{print_output, print_single, print_success};
use super::OutputFormat;

#[derive(Args, Debug)]
pub struct CalendarCommand {
    #[command(subcommand)]
    pub command: CalendarSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum CalendarSubcommand {
    /// Create an event in a user's calendar
    Add {
        /// Calendar owner (user or resource mailbox address)
        #[arg(short, long)]
        user: String,

        /// Event subject
        #[arg(short = 'T', long)]
        title: String,

        /// Start (YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        start: String,

        /// End (YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        end: String,

        /// Time zone of start/end
        #[arg(long, default_value = "Europe/Brussels")]
        timezone: String,

        /// Location name
        #[arg(short, long)]
        location: Option<String>,

        /// Attendees (comma-separated emails)
        #[arg(short, long)]
        attendees: Option<String>,

        /// Description (HTML)
        #[arg(short, long)]
        body: Option<String>,
    },

    /// List events in a window
    List {
        /// Calendar owner
        #[arg(short, long)]
        user: String,

        /// Window start (YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        start: String,

        /// Window end (YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        end: String,
    },

    /// Delete an event by its iCalUId
    Delete {
        /// Calendar owner
        #[arg(short, long)]
        user: String,

        /// iCalUId of the event
        uid: String,
    },

    /// Check whether an event with this iCalUId exists
    Exists {
        /// Calendar owner
        #[arg(short, long)]
        user: String,

        /// iCalUId of the event
        uid: String,
    },

    /// Check whether locations are free in a window
    Free {
        /// Resource mailboxes (comma-separated)
        #[arg(short, long)]
        locations: String,

        /// Window start (YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        start: String,

        /// Window end (YYYY-MM-DDTHH:MM)
        #[arg(short, long)]
        end: String,

        /// Time zone of the window
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
}

#[derive(Debug, Serialize, Tabled)]
struct EventRow {
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Subject")]
    subject: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "iCalUId")]
    ical_uid: String,
}

impl From<&GraphEvent> for EventRow {
    fn from(event: &GraphEvent) -> Self {
        Self {
            start: event
                .start
                .as_ref()
                .map(|s| s.date_time.clone())
                .unwrap_or_default(),
            subject: event.subject.clone().unwrap_or_default(),
            location: event
                .location
                .as_ref()
                .and_then(|l| l.display_name.clone())
                .unwrap_or_default(),
            ical_uid: event.ical_uid.clone().unwrap_or_default(),
        }
    }
}

pub async fn execute(cmd: CalendarCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let client = GraphClient::new(config.graph.clone())?;

    match cmd.command {
        CalendarSubcommand::Add {
            user,
            title,
            start,
            end,
            timezone,
            location,
            attendees,
            body,
        } => {
            let mut event = json!({
                "subject": title,
                "start": { "dateTime": parse_local(&start)?.format("%Y-%m-%dT%H:%M:%S").to_string(), "timeZone": timezone },
                "end": { "dateTime": parse_local(&end)?.format("%Y-%m-%dT%H:%M:%S").to_string(), "timeZone": timezone },
            });
            if let Some(location) = location {
                event["location"] = json!({ "displayName": location });
            }
            if let Some(body) = body {
                event["body"] = json!({ "contentType": "HTML", "content": body });
            }
            if let Some(attendees) = attendees {
                let list: Vec<_> = attendees
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|address| {
                        json!({
                            "emailAddress": { "address": address, "name": address },
                            "type": "required",
                        })
                    })
                    .collect();
                event["attendees"] = json!(list);
            }

            let created = client.add_event(&user, &event).await?;
            print_single(&created, format);
            Ok(())
        }
        CalendarSubcommand::List { user, start, end } => {
            let events = client
                .list_events(&user, parse_local(&start)?, parse_local(&end)?)
                .await?;
            let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
            print_output(&rows, format);
            Ok(())
        }
        CalendarSubcommand::Delete { user, uid } => {
            client.delete_event(&user, &uid).await?;
            print_success(&format!("event {} deleted", uid));
            Ok(())
        }
        CalendarSubcommand::Exists { user, uid } => {
            let exists = client.event_exists(&user, &uid).await?;
            println!("{}", exists);
            Ok(())
        }
        CalendarSubcommand::Free {
            locations,
            start,
            end,
            timezone,
        } => {
            let locations: Vec<String> = locations
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            let free = client
                .is_location_free(&locations, parse_local(&start)?, parse_local(&end)?, &timezone)
                .await?;
            println!("{}", free);
            Ok(())
        }
    }
}

/// Parse a local date/time argument, seconds optional.
pub fn parse_local(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .with_context(|| format!("invalid date/time (expected YYYY-MM-DDTHH:MM): {}", value))
}
