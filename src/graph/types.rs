use serde::{Deserialize, Serialize};

/// Date time with timezone
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeZone {
    pub date_time: String,
    pub time_zone: String,
}

/// Event location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub display_name: Option<String>,
}

/// Simple email address
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddressSimple {
    pub name: Option<String>,
    pub address: Option<String>,
}

/// Event attendee
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email_address: Option<EmailAddressSimple>,
    #[serde(rename = "type")]
    pub attendee_type: Option<String>,
}

/// Calendar event as returned by the Graph API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEvent {
    pub id: Option<String>,
    #[serde(rename = "iCalUId")]
    pub ical_uid: Option<String>,
    pub subject: Option<String>,
    pub start: Option<DateTimeZone>,
    pub end: Option<DateTimeZone>,
    pub location: Option<Location>,
    pub attendees: Option<Vec<Attendee>>,
    pub is_all_day: Option<bool>,
    pub is_cancelled: Option<bool>,
}

/// Event list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub value: Vec<GraphEvent>,
}

/// getSchedule response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    #[serde(default)]
    pub value: Vec<ScheduleInfo>,
}

/// Free/busy information for one schedule (resource mailbox)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleInfo {
    pub schedule_id: Option<String>,
    #[serde(default)]
    pub schedule_items: Vec<ScheduleItem>,
}

/// One busy slot in a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub start: Option<DateTimeZone>,
    pub end: Option<DateTimeZone>,
    pub status: Option<String>,
    pub subject: Option<String>,
}
