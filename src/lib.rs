//! schoolcomm - communication toolkit for school back offices
//!
//! Four building blocks: calendar invite (ICS) generation, SMTP mail
//! dispatch, a Microsoft Graph calendar client, and a message relay
//! client for school platform web services.

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod ics;
pub mod mail;
pub mod relay;

pub use config::Config;
pub use error::{Error, Result};
pub use graph::GraphClient;
pub use ics::IcsEvent;
pub use mail::{MailMessage, Mailer, Recipient};
pub use relay::{RelayClient, RelayMessage, SendOutcome};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
