use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::ics::IcsEvent;
use crate::mail::{MailMessage, Mailer, Recipient};

use super::output::print_success;
use super::OutputFormat;

#[derive(Args, Debug)]
pub struct MailCommand {
    #[command(subcommand)]
    pub command: MailSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum MailSubcommand {
    /// Send a mail
    Send {
        /// Recipients (comma-separated)
        #[arg(short, long)]
        to: String,

        /// Subject line
        #[arg(short, long)]
        subject: String,

        /// Message body (HTML unless --plain)
        #[arg(short, long)]
        body: Option<String>,

        /// Read the body from a file instead
        #[arg(long, conflicts_with = "body")]
        body_file: Option<String>,

        /// Sender address (defaults to smtp.from)
        #[arg(long)]
        from: Option<String>,

        /// Cc recipients (comma-separated)
        #[arg(long)]
        cc: Option<String>,

        /// Bcc recipients (comma-separated)
        #[arg(long)]
        bcc: Option<String>,

        /// Attach a file (repeatable)
        #[arg(short, long)]
        attach: Vec<String>,

        /// Send the body as plain text
        #[arg(long)]
        plain: bool,

        /// Reroute to --test-recipient instead of the real recipients
        #[arg(long, requires = "test_recipient")]
        test: bool,

        /// Recipient used in test mode
        #[arg(long)]
        test_recipient: Option<String>,

        /// Attach a calendar invite starting at this local time
        /// (YYYY-MM-DDTHH:MM), requires --invite-end
        #[arg(long, requires = "invite_end")]
        invite_start: Option<String>,

        /// Invite end time (YYYY-MM-DDTHH:MM)
        #[arg(long, requires = "invite_start")]
        invite_end: Option<String>,

        /// Invite summary (defaults to the mail subject)
        #[arg(long)]
        invite_summary: Option<String>,

        /// Invite location
        #[arg(long)]
        invite_location: Option<String>,
    },
}

pub async fn execute(cmd: MailCommand, config: &Config, _format: OutputFormat) -> Result<()> {
    match cmd.command {
        MailSubcommand::Send {
            to,
            subject,
            body,
            body_file,
            from,
            cc,
            bcc,
            attach,
            plain,
            test,
            test_recipient,
            invite_start,
            invite_end,
            invite_summary,
            invite_location,
        } => {
            let from_address = from.unwrap_or_else(|| config.smtp.from.clone());
            if from_address.is_empty() {
                bail!("no sender: pass --from or set smtp.from in the configuration");
            }

            let body_text = match (body, body_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read body file: {}", path))?,
                (None, None) => String::new(),
            };

            let mut message = MailMessage::new(
                Recipient::new(from_address.clone()),
                parse_recipients(&to),
                &subject,
            );
            message.body = body_text;
            message.is_html = !plain;
            message.test_mode = test;
            message.test_recipient = test_recipient.map(Recipient::new);
            if let Some(cc) = cc {
                message.cc = parse_recipients(&cc);
            }
            if let Some(bcc) = bcc {
                message.bcc = parse_recipients(&bcc);
            }

            let mut mailer = Mailer::new(&config.smtp)?;
            for path in &attach {
                let (dir, name) = split_path(path)?;
                mailer.attach_file(&dir, &name, None)?;
            }

            if let (Some(start), Some(end)) = (invite_start, invite_end) {
                let mut event = IcsEvent::new();
                event.dtstart = super::calendar::parse_local(&start)?;
                event.dtend = super::calendar::parse_local(&end)?;
                event.summary = invite_summary.unwrap_or_else(|| subject.clone());
                event.location = invite_location.unwrap_or_default();
                event.organizer_email = from_address;
                if let Some(first) = message.to.first() {
                    event.attendee_email = first.address.clone();
                }
                mailer.attach_ics(&event, "invite.ics")?;
            }

            mailer.send(&message).await?;
            print_success(&format!("mail sent: {}", subject));
            Ok(())
        }
    }
}

fn parse_recipients(list: &str) -> Vec<Recipient> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Recipient::new)
        .collect()
}

fn split_path(path: &str) -> Result<(String, String)> {
    let path = Path::new(path);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", path.display()))?;
    let dir = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ".".to_string());
    Ok((dir, name.to_string()))
}
