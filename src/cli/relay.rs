use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::relay::{Attachment, MemorySendLog, RelayClient, RelayMessage, SendOutcome};

use super::output::{print_error, print_success};
use super::OutputFormat;

#[derive(Args, Debug)]
pub struct RelayCommand {
    #[command(subcommand)]
    pub command: RelaySubcommand,
}

#[derive(Subcommand, Debug)]
pub enum RelaySubcommand {
    /// Send a message through the platform
    Send {
        /// Platform username of the addressee
        #[arg(short, long)]
        recipient: String,

        /// Subject line
        #[arg(short, long)]
        subject: String,

        /// Message body
        #[arg(short, long)]
        body: Option<String>,

        /// Read the body from a file instead
        #[arg(long, conflicts_with = "body")]
        body_file: Option<String>,

        /// Account id (0 = main account)
        #[arg(short, long, default_value_t = 0)]
        account: u32,

        /// Attach a file (repeatable)
        #[arg(long)]
        attach: Vec<String>,

        /// Reroute to the configured test user
        #[arg(long)]
        debug: bool,
    },
}

pub async fn execute(cmd: RelayCommand, config: &Config, _format: OutputFormat) -> Result<()> {
    match cmd.command {
        RelaySubcommand::Send {
            recipient,
            subject,
            body,
            body_file,
            account,
            attach,
            debug,
        } => {
            let body_text = match (body, body_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read body file: {}", path))?,
                (None, None) => String::new(),
            };

            let mut message = RelayMessage::new(&recipient, &subject, body_text, account);
            for path in &attach {
                message.attachments.push(read_attachment(path)?);
            }

            let log = Arc::new(MemorySendLog::new());
            let client = RelayClient::connect(config.relay.clone(), log).await?;

            match client.send(&message, debug).await? {
                SendOutcome::Sent => {
                    print_success(&format!("message relayed to {}", recipient));
                }
                SendOutcome::Failed { code, message } => {
                    print_error(&format!("delivery failed ({}): {}", code, message));
                }
            }
            Ok(())
        }
    }
}

fn read_attachment(path: &str) -> Result<Attachment> {
    let content =
        fs::read(path).with_context(|| format!("Failed to read attachment: {}", path))?;
    let file_name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("not a file path: {}", path))?
        .to_string();
    Ok(Attachment { file_name, content })
}
