//! Calendar invite (ICS) text generation.
//!
//! Produces an RFC-5545 style VCALENDAR/VEVENT block suitable for
//! attaching to a mail as `text/calendar; method=REQUEST`. The DTSTAMP is
//! emitted in UTC; DTSTART/DTEND are zoned, Europe/Brussels by default.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

/// Default event timezone for DTSTART/DTEND.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Brussels;

/// One calendar invite. Constructed fresh per invocation and immediately
/// serialized; never persisted.
#[derive(Debug, Clone)]
pub struct IcsEvent {
    pub uid: String,
    pub sequence: u32,
    /// Creation timestamp, emitted as UTC DTSTAMP
    pub dtstamp: DateTime<Utc>,
    /// Event start, interpreted in `timezone`
    pub dtstart: NaiveDateTime,
    /// Event end, interpreted in `timezone`
    pub dtend: NaiveDateTime,
    pub summary: String,
    pub location: String,
    pub description: String,
    pub organizer_name: String,
    pub organizer_email: String,
    pub attendee_name: String,
    pub attendee_email: String,
    pub timezone: Tz,
}

impl Default for IcsEvent {
    fn default() -> Self {
        let now = Utc::now();
        Self::with_now_and_uid(now, format!("{}@schoolcomm", Uuid::new_v4()))
    }
}

impl IcsEvent {
    /// New event with generated uid and timestamps relative to now.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic constructor: all generated values are injected.
    pub fn with_now_and_uid(now: DateTime<Utc>, uid: String) -> Self {
        let local_now = now.with_timezone(&DEFAULT_TIMEZONE).naive_local();
        Self {
            uid,
            sequence: 0,
            dtstamp: now,
            dtstart: local_now,
            dtend: local_now + Duration::hours(1),
            summary: String::new(),
            location: String::new(),
            description: String::new(),
            organizer_name: String::new(),
            organizer_email: String::new(),
            attendee_name: String::new(),
            attendee_email: String::new(),
            timezone: DEFAULT_TIMEZONE,
        }
    }

    /// Serialize to ICS text (CRLF line endings, UTF-8).
    pub fn to_ics(&self) -> String {
        let organizer_name = display_name(&self.organizer_name, &self.organizer_email);
        let attendee_name = display_name(&self.attendee_name, &self.attendee_email);

        let lines = [
            "BEGIN:VCALENDAR".to_string(),
            "PRODID:-//schoolcomm//calendar invite//EN".to_string(),
            "VERSION:2.0".to_string(),
            "CALSCALE:GREGORIAN".to_string(),
            "METHOD:REQUEST".to_string(),
            "BEGIN:VEVENT".to_string(),
            format!("UID:{}", self.uid),
            format!("SEQUENCE:{}", self.sequence),
            format!("DTSTAMP:{}", self.dtstamp.format("%Y%m%dT%H%M%SZ")),
            format!(
                "DTSTART;TZID={}:{}",
                self.timezone.name(),
                self.dtstart.format("%Y%m%dT%H%M%S")
            ),
            format!(
                "DTEND;TZID={}:{}",
                self.timezone.name(),
                self.dtend.format("%Y%m%dT%H%M%S")
            ),
            format!("SUMMARY:{}", escape_text(&self.summary)),
            format!("LOCATION:{}", escape_text(&self.location)),
            format!("DESCRIPTION:{}", escape_text(&self.description)),
            format!(
                "ORGANIZER;CN={}:mailto:{}",
                organizer_name, self.organizer_email
            ),
            format!(
                "ATTENDEE;ROLE=REQ-PARTICIPANT;PARTSTAT=NEEDS-ACTION;RSVP=TRUE;CN={}:mailto:{}",
                attendee_name, self.attendee_email
            ),
            "END:VEVENT".to_string(),
            "END:VCALENDAR".to_string(),
        ];

        let mut out = lines.join("\r\n");
        out.push_str("\r\n");
        out
    }
}

fn display_name<'a>(name: &'a str, email: &'a str) -> &'a str {
    if name.is_empty() {
        email
    } else {
        name
    }
}

/// Escape reserved ICS characters in a free-text field.
///
/// The backslash rule runs first; later rules must not re-escape the
/// backslashes it inserts.
pub fn escape_text(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
        .replace(':', "\\:")
        .replace('\n', "\\n")
        .replace('\r', "\\n")
}
