//! Mail dispatch over SMTP.
//!
//! Thin wrapper around lettre: one pooled SMTP connection per
//! [`Mailer`], attachments accumulated on the dispatcher and flushed
//! with the next [`Mailer::send`]. The connection is released when the
//! mailer is dropped, on every exit path.

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fs;

use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use crate::ics::IcsEvent;

/// Fixed alternative body for HTML mails
const PLAIN_ALTERNATIVE: &str = "To view the message, please use an HTML compatible email viewer!";

/// A mail endpoint: address plus optional display name.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub address: String,
    pub display_name: Option<String>,
}

impl Recipient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
        }
    }

    pub fn named(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: Some(name.into()),
        }
    }

    /// The display name defaults to the address itself.
    fn mailbox(&self) -> Result<Mailbox> {
        let name = self
            .display_name
            .clone()
            .unwrap_or_else(|| self.address.clone());
        Ok(Mailbox::new(Some(name), self.address.parse()?))
    }
}

/// One outgoing mail.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub from: Recipient,
    pub to: Vec<Recipient>,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
    /// When set, `to` is ignored and the mail goes to `test_recipient` only
    pub test_mode: bool,
    pub test_recipient: Option<Recipient>,
    pub cc: Vec<Recipient>,
    pub bcc: Vec<Recipient>,
}

impl MailMessage {
    pub fn new(from: Recipient, to: Vec<Recipient>, subject: impl Into<String>) -> Self {
        Self {
            from,
            to,
            subject: subject.into(),
            body: String::new(),
            is_html: true,
            test_mode: false,
            test_recipient: None,
            cc: Vec::new(),
            bcc: Vec::new(),
        }
    }
}

/// SMTP mail dispatcher.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    attachments: Vec<SinglePart>,
}

impl Mailer {
    /// Configure the SMTP transport. STARTTLS on port 587 by default;
    /// `security = "tls"` selects implicit TLS.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let builder = match config.security.as_str() {
            "tls" => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?,
            _ => AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?,
        };

        let mut builder = builder.port(config.port);
        if config.auth {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            attachments: Vec::new(),
        })
    }

    /// Attach a file from `dir` (trailing separator optional).
    pub fn attach_file(&mut self, dir: &str, name: &str, content_type: Option<&str>) -> Result<()> {
        let content = fs::read(join_dir(dir, name))?;
        let part = Attachment::new(name.to_string())
            .body(Body::new(content), parse_content_type(content_type)?);
        self.attachments.push(part);
        Ok(())
    }

    /// Attach an image referenced from an HTML body as `cid:{cid}`.
    pub fn attach_inline_image(
        &mut self,
        dir: &str,
        name: &str,
        cid: &str,
        content_type: Option<&str>,
    ) -> Result<()> {
        let content = fs::read(join_dir(dir, name))?;
        let part = Attachment::new_inline(cid.to_string())
            .body(Body::new(content), parse_content_type(content_type)?);
        self.attachments.push(part);
        Ok(())
    }

    /// Attach a calendar invite built from `event`.
    pub fn attach_ics(&mut self, event: &IcsEvent, filename: &str) -> Result<()> {
        let content_type = parse_content_type(Some("text/calendar; method=REQUEST; charset=UTF-8"))?;
        let part = Attachment::new(filename.to_string())
            .body(Body::new(event.to_ics().into_bytes()), content_type);
        self.attachments.push(part);
        Ok(())
    }

    /// Send one message, consuming any accumulated attachments. Transport
    /// failures surface to the caller; there is no retry.
    pub async fn send(&mut self, message: &MailMessage) -> Result<()> {
        let attachments = std::mem::take(&mut self.attachments);
        let email = build_message(message, attachments)?;
        self.transport.send(email).await?;
        tracing::info!(subject = %message.subject, "mail sent");
        Ok(())
    }
}

/// Recipients the message actually goes to: the test recipient replaces
/// the entire `to` list in test mode, cc/bcc are unaffected.
fn effective_to(message: &MailMessage) -> Result<Vec<&Recipient>> {
    if message.test_mode {
        let test = message.test_recipient.as_ref().ok_or_else(|| {
            Error::Configuration("test mode requires a test recipient".to_string())
        })?;
        Ok(vec![test])
    } else {
        Ok(message.to.iter().collect())
    }
}

fn build_message(message: &MailMessage, attachments: Vec<SinglePart>) -> Result<Message> {
    let mut builder = Message::builder()
        .from(message.from.mailbox()?)
        .subject(message.subject.clone());

    for recipient in effective_to(message)? {
        builder = builder.to(recipient.mailbox()?);
    }
    for recipient in &message.cc {
        builder = builder.cc(recipient.mailbox()?);
    }
    for recipient in &message.bcc {
        builder = builder.bcc(recipient.mailbox()?);
    }

    let body_part = if message.is_html {
        SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(message.body.clone())
    } else {
        SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
    };

    let email = if message.is_html {
        let alternative = MultiPart::alternative()
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(PLAIN_ALTERNATIVE.to_string()),
            )
            .singlepart(body_part);
        if attachments.is_empty() {
            builder.multipart(alternative)?
        } else {
            let mut mixed = MultiPart::mixed().multipart(alternative);
            for part in attachments {
                mixed = mixed.singlepart(part);
            }
            builder.multipart(mixed)?
        }
    } else if attachments.is_empty() {
        builder.singlepart(body_part)?
    } else {
        let mut mixed = MultiPart::mixed().singlepart(body_part);
        for part in attachments {
            mixed = mixed.singlepart(part);
        }
        builder.multipart(mixed)?
    };

    Ok(email)
}

/// Normalize a directory path to end with a separator before appending
/// the filename.
fn join_dir(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}

fn parse_content_type(content_type: Option<&str>) -> Result<ContentType> {
    let value = content_type.unwrap_or("application/octet-stream");
    ContentType::parse(value)
        .map_err(|e| Error::Configuration(format!("invalid content type '{}': {}", value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> MailMessage {
        let mut message = MailMessage::new(
            Recipient::named("noreply@school.be", "School"),
            vec![
                Recipient::new("a@example.be"),
                Recipient::new("b@example.be"),
            ],
            "Report",
        );
        message.body = "<p>Hello</p>".to_string();
        message
    }

    #[test]
    fn join_dir_normalizes_separator() {
        assert_eq!(join_dir("/tmp/files", "a.pdf"), "/tmp/files/a.pdf");
        assert_eq!(join_dir("/tmp/files/", "a.pdf"), "/tmp/files/a.pdf");
    }

    #[test]
    fn test_mode_replaces_recipients() {
        let mut message = sample_message();
        message.test_mode = true;
        message.test_recipient = Some(Recipient::new("tester@school.be"));
        message.cc = vec![Recipient::new("cc@example.be")];

        let to = effective_to(&message).unwrap();
        assert_eq!(to.len(), 1);
        assert_eq!(to[0].address, "tester@school.be");
        // cc stays untouched by test mode
        assert_eq!(message.cc.len(), 1);
    }

    #[test]
    fn test_mode_without_recipient_is_a_config_error() {
        let mut message = sample_message();
        message.test_mode = true;
        assert!(matches!(
            effective_to(&message),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn built_message_targets_test_recipient_only() {
        let mut message = sample_message();
        message.test_mode = true;
        message.test_recipient = Some(Recipient::new("tester@school.be"));
        message.cc = vec![Recipient::new("cc@example.be")];

        let email = build_message(&message, Vec::new()).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(formatted.contains("tester@school.be"));
        assert!(formatted.contains("cc@example.be"));
        assert!(!formatted.contains("a@example.be"));
        assert!(!formatted.contains("b@example.be"));
    }

    #[test]
    fn html_mail_carries_plain_alternative() {
        let message = sample_message();
        let email = build_message(&message, Vec::new()).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(formatted.contains("HTML compatible email viewer"));
        assert!(formatted.contains("<p>Hello</p>"));
    }

    #[test]
    fn ics_attachment_uses_calendar_content_type() {
        let now = chrono::Utc::now();
        let event = IcsEvent::with_now_and_uid(now, "uid@schoolcomm".to_string());
        let part = Attachment::new("invite.ics".to_string()).body(
            Body::new(event.to_ics().into_bytes()),
            parse_content_type(Some("text/calendar; method=REQUEST; charset=UTF-8")).unwrap(),
        );
        let message = sample_message();
        let email = build_message(&message, vec![part]).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(formatted.contains("text/calendar"));
        assert!(formatted.contains("method=REQUEST"));
    }

    #[tokio::test]
    async fn attaches_file_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("report.txt"), b"hello").unwrap();

        let config = SmtpConfig {
            host: "localhost".to_string(),
            ..Default::default()
        };
        let mut mailer = Mailer::new(&config).unwrap();
        mailer
            .attach_file(dir.path().to_str().unwrap(), "report.txt", Some("text/plain"))
            .unwrap();
        assert_eq!(mailer.attachments.len(), 1);
    }

    #[tokio::test]
    async fn missing_attachment_file_is_an_io_error() {
        let config = SmtpConfig {
            host: "localhost".to_string(),
            ..Default::default()
        };
        let mut mailer = Mailer::new(&config).unwrap();
        let err = mailer
            .attach_file("/nonexistent", "report.txt", None)
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn display_name_defaults_to_address() {
        let mailbox = Recipient::new("a@example.be").mailbox().unwrap();
        let rendered = mailbox.to_string();
        assert!(rendered.contains("a@example.be"));
        assert!(rendered.contains("<a@example.be>"));
    }
}
