//! Message relay client for the school platform SOAP web services.
//!
//! Delivery goes through the platform's `sendMsg` operation. Every
//! attempt, success or failure, is written to the [`SendLog`]; failures
//! additionally run the caller-supplied failure handler. By default a
//! failed delivery is returned as an error; setting
//! `relay.swallow_errors` restores the legacy fire-and-forget behavior
//! where the log is the only failure channel.

use base64::prelude::*;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::RelayConfig;
use crate::error::{Error, Result};
use crate::relay::log::{SendLog, SendLogRecord, SUCCESS_MESSAGE};
use crate::relay::soap;

/// Outcome of a delivery attempt that was not rejected locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Delivery failed; only returned when `swallow_errors` is set,
    /// otherwise the failure surfaces as an error.
    Failed { code: i32, message: String },
}

/// One message to relay.
#[derive(Debug, Clone)]
pub struct RelayMessage {
    /// Platform username of the addressee
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// 0 targets the main account, higher numbers a co-account
    pub account: u32,
    pub attachments: Vec<Attachment>,
}

impl RelayMessage {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        account: u32,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            account,
            attachments: Vec::new(),
        }
    }
}

/// File attached to a relayed message, wired as base64 JSON.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
    pub content: Vec<u8>,
}

type FailureHandler = Arc<dyn Fn(i32, &str) + Send + Sync>;

pub struct RelayClient {
    http: Client,
    config: RelayConfig,
    service_url: String,
    log: Arc<dyn SendLog>,
    on_failure: Option<FailureHandler>,
}

impl RelayClient {
    /// Connect to the platform web services. The service description is
    /// probed up front so a wrong platform name fails here, not on the
    /// first send.
    pub async fn connect(config: RelayConfig, log: Arc<dyn SendLog>) -> Result<Self> {
        if config.platform.is_empty() && config.service_url.is_empty() {
            return Err(Error::Configuration("relay.platform is not set".to_string()));
        }

        let service_url = if config.service_url.is_empty() {
            format!("https://{}/Webservices/V3", config.platform)
        } else {
            config.service_url.clone()
        };

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        let probe = http.get(format!("{}?wsdl", service_url)).send().await;
        match probe {
            Ok(res) if res.status().is_success() => {}
            Ok(res) => {
                tracing::error!(%service_url, status = %res.status(), "web service probe failed");
                return Err(Error::Remote {
                    code: res.status().as_u16() as i32,
                    message: format!("service description not available at {}", service_url),
                });
            }
            Err(e) => {
                tracing::error!(%service_url, error = %e, "web service connection failed");
                return Err(e.into());
            }
        }

        Ok(Self {
            http,
            config,
            service_url,
            log,
            on_failure: None,
        })
    }

    /// Install a handler invoked on every delivery failure, after the
    /// log record is written and before the error is returned or
    /// swallowed.
    pub fn on_failure(mut self, handler: impl Fn(i32, &str) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(handler));
        self
    }

    /// Send a message. With `debug` set, the message is rerouted to the
    /// configured test user on the test platform (subject prefixed with
    /// "Test: "); the test-user configuration is validated before any
    /// network traffic.
    pub async fn send(&self, message: &RelayMessage, debug: bool) -> Result<SendOutcome> {
        if debug {
            self.send_test(message).await
        } else {
            self.deliver(message).await
        }
    }

    async fn send_test(&self, message: &RelayMessage) -> Result<SendOutcome> {
        let test_user = &self.config.test_user;
        if !test_user.is_complete() {
            return Err(Error::Configuration(
                "test user information is incomplete".to_string(),
            ));
        }

        let test_config = RelayConfig {
            platform: test_user.platform.clone(),
            password: test_user.password.clone(),
            service_url: String::new(),
            swallow_errors: self.config.swallow_errors,
            timeout: self.config.timeout,
            test_user: Default::default(),
        };

        let mut client = RelayClient::connect(test_config, Arc::clone(&self.log)).await?;
        client.on_failure = self.on_failure.clone();

        let rerouted = RelayMessage {
            recipient: test_user.username.clone(),
            subject: format!("Test: {}", message.subject),
            body: message.body.clone(),
            account: test_user.account,
            attachments: message.attachments.clone(),
        };
        client.deliver(&rerouted).await
    }

    async fn deliver(&self, message: &RelayMessage) -> Result<SendOutcome> {
        let account = message.account.to_string();
        let attachments = attachment_list(&message.attachments);
        let params = [
            ("accesscode", Some(self.config.password.as_str())),
            ("userIdentifier", Some(message.recipient.as_str())),
            ("title", Some(message.subject.as_str())),
            ("body", Some(message.body.as_str())),
            ("senderIdentifier", None),
            ("attachmentlist", attachments.as_deref()),
            ("coaccount", Some(account.as_str())),
        ];

        let status = match self.call("sendMsg", &params).await {
            Ok(value) => value.trim().parse::<i32>().map_err(|_| {
                Error::MalformedResponse(format!("sendMsg returned non-numeric status: {}", value))
            })?,
            Err(e) => return self.fail(message, None, e.to_string()).await,
        };

        if status == 0 {
            self.write_log(message, SUCCESS_MESSAGE);
            tracing::info!(
                recipient = %message.recipient,
                subject = %message.subject,
                account = message.account,
                "mail sent successfully"
            );
            return Ok(SendOutcome::Sent);
        }

        let reason = self.error_message(status).await;
        self.fail(message, Some(status), reason).await
    }

    /// Log a failed attempt, run the failure handler, then either
    /// return the failure as an error or as a swallowed outcome.
    async fn fail(
        &self,
        message: &RelayMessage,
        code: Option<i32>,
        reason: String,
    ) -> Result<SendOutcome> {
        self.write_log(message, &reason);
        tracing::error!(
            recipient = %message.recipient,
            subject = %message.subject,
            account = message.account,
            "{}", reason
        );

        let code = code.unwrap_or(-1);
        if let Some(handler) = &self.on_failure {
            handler(code, &reason);
        }

        if self.config.swallow_errors {
            Ok(SendOutcome::Failed {
                code,
                message: reason,
            })
        } else {
            Err(Error::Remote {
                code,
                message: reason,
            })
        }
    }

    /// Look up the message for a non-zero status via the service's
    /// published error-code table.
    async fn error_message(&self, code: i32) -> String {
        let fallback = || format!("unknown error code {}", code);
        let raw = match self.call("returnJsonErrorCodes", &[]).await {
            Ok(raw) => raw,
            Err(_) => return fallback(),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(codes) => codes
                .get(code.to_string())
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(fallback),
            Err(_) => fallback(),
        }
    }

    async fn call(&self, operation: &str, params: &[(&str, Option<&str>)]) -> Result<String> {
        let res = self
            .http
            .post(&self.service_url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}\"", operation))
            .body(soap::envelope(operation, params))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Remote {
                code: status.as_u16() as i32,
                message: body,
            });
        }

        soap::extract_return(&res.text().await?)
    }

    fn write_log(&self, message: &RelayMessage, error_message: &str) {
        self.log.record(SendLogRecord {
            recipient: message.recipient.clone(),
            subject: message.subject.clone(),
            account_id: message.account,
            service_credential: self.config.password.clone(),
            error_message: error_message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Serialize attachments to the JSON list the service expects; an empty
/// list is sent as nil.
fn attachment_list(attachments: &[Attachment]) -> Option<String> {
    if attachments.is_empty() {
        return None;
    }
    let entries: Vec<Value> = attachments
        .iter()
        .map(|a| {
            json!({
                "filename": a.file_name,
                "filedata": BASE64_STANDARD.encode(&a.content),
            })
        })
        .collect();
    Some(Value::Array(entries).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachments_encode_as_base64_entries() {
        let list = attachment_list(&[Attachment {
            file_name: "report.pdf".to_string(),
            content: b"%PDF-1.7".to_vec(),
        }])
        .unwrap();
        let parsed: Value = serde_json::from_str(&list).unwrap();
        assert_eq!(parsed[0]["filename"], "report.pdf");
        assert_eq!(parsed[0]["filedata"], BASE64_STANDARD.encode(b"%PDF-1.7"));
    }

    #[test]
    fn empty_attachment_list_is_nil() {
        assert!(attachment_list(&[]).is_none());
    }
}
