//! Microsoft Graph calendar client.
//!
//! Application-permission flow: a client-credentials token is fetched
//! lazily on the first call and cached. A request answered with 401 is
//! retried once after re-authenticating; a second 401 surfaces as an
//! error.

use chrono::{Duration, NaiveDateTime};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::sync::RwLock;

use crate::config::GraphConfig;
use crate::error::{Error, Result};
use crate::graph::types::{EventList, GraphEvent, ScheduleResponse};
use crate::graph::SCOPE_GRAPH;

/// Date format Graph expects in query parameters and schedule windows
const GRAPH_DATETIME: &str = "%Y-%m-%dT%H:%M:%S";

pub struct GraphClient {
    http: Client,
    config: GraphConfig,
    token: RwLock<Option<String>>,
}

impl GraphClient {
    /// Create a client for the configured tenant. Credentials must be
    /// present; the token is only fetched on first use.
    pub fn new(config: GraphConfig) -> Result<Self> {
        if config.tenant_id.is_empty() {
            return Err(Error::Configuration("graph.tenant_id is not set".to_string()));
        }
        if config.client_id.is_empty() {
            return Err(Error::Configuration("graph.client_id is not set".to_string()));
        }
        if config.client_secret.is_empty() {
            return Err(Error::Configuration(
                "graph.client_secret is not set".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            http,
            config,
            token: RwLock::new(None),
        })
    }

    /// Exchange the client credentials for an access token and cache it.
    pub async fn authenticate(&self) -> Result<String> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", SCOPE_GRAPH),
            ("grant_type", "client_credentials"),
        ];

        let res = self
            .http
            .post(self.config.token_endpoint())
            .form(&params)
            .send()
            .await?;

        let data: Value = res.json().await?;
        match data.get("access_token").and_then(|t| t.as_str()) {
            Some(token) => {
                *self.token.write().unwrap() = Some(token.to_string());
                Ok(token.to_string())
            }
            None => {
                tracing::error!("failed to obtain access token from identity provider");
                Err(Error::Authentication(
                    "token response carried no access_token".to_string(),
                ))
            }
        }
    }

    /// Inject or clear a token, bypassing the credential exchange.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.token.write().unwrap() = token;
    }

    async fn current_token(&self) -> Result<String> {
        let cached = self.token.read().unwrap().clone();
        match cached {
            Some(token) => Ok(token),
            None => self.authenticate().await,
        }
    }

    /// Run a request with bearer auth; one re-auth retry on 401.
    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let token = self.current_token().await?;
        let res = build(&self.http).bearer_auth(&token).send().await?;
        if res.status() != StatusCode::UNAUTHORIZED {
            return check(res).await;
        }

        tracing::debug!("access token rejected, re-authenticating");
        self.set_access_token(None);
        let token = self.authenticate().await?;
        let res = build(&self.http).bearer_auth(&token).send().await?;
        check(res).await
    }

    /// Create an event in the user's (or resource mailbox's) calendar.
    /// `event` is a Graph event payload; the created event is returned.
    pub async fn add_event(&self, user: &str, event: &Value) -> Result<GraphEvent> {
        let url = format!("{}/users/{}/calendar/events", self.config.base_url, user);
        let res = self
            .send_authorized(|http| http.post(&url).json(event))
            .await?;
        Ok(res.json().await?)
    }

    /// Update an event identified by its iCalUId. The patch payload has
    /// the same shape as in [`GraphClient::add_event`].
    pub async fn update_event(
        &self,
        user: &str,
        ical_uid: &str,
        event: &Value,
    ) -> Result<GraphEvent> {
        let event_id = self.event_id_by_ical_uid(user, ical_uid).await?;
        let url = format!("{}/users/{}/events/{}", self.config.base_url, user, event_id);
        let res = self
            .send_authorized(|http| http.patch(&url).json(event))
            .await?;
        Ok(res.json().await?)
    }

    /// Delete an event identified by its iCalUId.
    pub async fn delete_event(&self, user: &str, ical_uid: &str) -> Result<()> {
        let event_id = self.event_id_by_ical_uid(user, ical_uid).await?;
        let url = format!("{}/users/{}/events/{}", self.config.base_url, user, event_id);
        self.send_authorized(|http| http.delete(&url)).await?;
        Ok(())
    }

    /// Whether an event with this iCalUId exists in the user's calendar.
    /// Only the not-found case maps to `false`; other failures surface.
    pub async fn event_exists(&self, user: &str, ical_uid: &str) -> Result<bool> {
        match self.event_id_by_ical_uid(user, ical_uid).await {
            Ok(_) => Ok(true),
            Err(Error::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List up to 100 events between two local date/times, ordered by
    /// start. An empty window yields an empty list, never an error.
    pub async fn list_events(
        &self,
        user: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<GraphEvent>> {
        let url = format!("{}/users/{}/calendar/events", self.config.base_url, user);
        let res = self
            .send_authorized(|http| {
                http.get(&url).query(&[
                    ("startDateTime", start.format(GRAPH_DATETIME).to_string()),
                    ("endDateTime", end.format(GRAPH_DATETIME).to_string()),
                    ("$orderby", "start/dateTime".to_string()),
                    ("$top", "100".to_string()),
                ])
            })
            .await?;
        let list: EventList = res.json().await?;
        Ok(list.value)
    }

    /// Check whether all the given resource mailboxes are free in the
    /// window. The window is narrowed by 60 seconds on each side so that
    /// back-to-back bookings do not count as conflicts.
    pub async fn is_location_free(
        &self,
        locations: &[String],
        start: NaiveDateTime,
        end: NaiveDateTime,
        time_zone: &str,
    ) -> Result<bool> {
        let first = locations.first().ok_or_else(|| {
            Error::Configuration("at least one location address is required".to_string())
        })?;

        let url = format!("{}/users/{}/calendar/getSchedule", self.config.base_url, first);
        let body = json!({
            "schedules": locations,
            "startTime": {
                "dateTime": (start + Duration::seconds(60)).format(GRAPH_DATETIME).to_string(),
                "timeZone": time_zone,
            },
            "endTime": {
                "dateTime": (end - Duration::seconds(60)).format(GRAPH_DATETIME).to_string(),
                "timeZone": time_zone,
            },
            "availabilityViewInterval": 15,
        });

        let res = self
            .send_authorized(|http| http.post(&url).json(&body))
            .await?;
        let schedule: ScheduleResponse = res.json().await?;

        let busy = schedule
            .value
            .first()
            .map(|info| !info.schedule_items.is_empty())
            .unwrap_or(false);
        Ok(!busy)
    }

    /// Resolve the internal event id for an iCalUId.
    pub async fn event_id_by_ical_uid(&self, user: &str, ical_uid: &str) -> Result<String> {
        let url = format!("{}/users/{}/events", self.config.base_url, user);
        let filter = format!("iCalUId eq '{}'", ical_uid);
        let res = self
            .send_authorized(|http| http.get(&url).query(&[("$filter", filter.as_str())]))
            .await?;

        let list: EventList = res.json().await?;
        match list.value.first().and_then(|event| event.id.clone()) {
            Some(id) => Ok(id),
            None => {
                tracing::error!(ical_uid, "event not found");
                Err(Error::NotFound(format!("no event with iCalUId {}", ical_uid)))
            }
        }
    }
}

/// Map non-success statuses to errors, keeping the response body as the
/// message.
async fn check(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        Ok(res)
    } else {
        let body = res.text().await.unwrap_or_default();
        Err(Error::Remote {
            code: status.as_u16() as i32,
            message: body,
        })
    }
}
