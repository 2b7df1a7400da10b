//! Google Calendar API v3: calendars, event listing and event creation.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::client::GoogleClient;
use crate::core::ErrandError;

pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    pub id: String,
    pub summary: Option<String>,
    pub primary: Option<bool>,
    pub time_zone: Option<String>,
    pub access_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    items: Option<Vec<CalendarListEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    pub fn at(date_time: &str, time_zone: &str) -> Self {
        Self {
            date_time: Some(date_time.to_string()),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }

    /// `dateTime` for timed events, `date` for all-day events.
    pub fn display(&self) -> String {
        self.date_time
            .clone()
            .or_else(|| self.date.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub attendees: Option<Vec<Attendee>>,
    pub color_id: Option<String>,
    pub recurrence: Option<Vec<String>>,
    pub html_link: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventsResponse {
    items: Option<Vec<Event>>,
}

/// Query for `events.list`. Absent bounds are left out of the request
/// entirely rather than sent empty.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub calendar_id: String,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: u32,
}

impl EventQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", self.max_results.to_string()),
        ];
        if let Some(min) = &self.time_min {
            pairs.push(("timeMin", min.clone()));
        }
        if let Some(max) = &self.time_max {
            pairs.push(("timeMax", max.clone()));
        }
        pairs
    }
}

/// Request body for `events.insert`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    pub color_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
}

/// Wrap a bare repetition rule for the `recurrence` field. The rule
/// itself is passed through untouched; Google rejects bad ones.
pub fn recurrence_line(rule: &str) -> String {
    let rule = rule.trim();
    if rule.to_uppercase().starts_with("RRULE:") {
        rule.to_string()
    } else {
        format!("RRULE:{}", rule)
    }
}

fn encode_id(calendar_id: &str) -> String {
    urlencoding::encode(calendar_id).into_owned()
}

pub struct CalendarApi {
    client: GoogleClient,
}

impl CalendarApi {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }

    pub async fn list_calendars(&self) -> Result<Vec<CalendarListEntry>> {
        tracing::info!("Listing Google calendars");
        let resp = self.client.get("users/me/calendarList", &[]).await?;
        let calendars: CalendarListResponse = parse(resp)?;
        Ok(calendars.items.unwrap_or_default())
    }

    pub async fn list_events(&self, query: &EventQuery) -> Result<Vec<Event>> {
        tracing::info!("Listing events for calendar: {}", query.calendar_id);
        let path = format!("calendars/{}/events", encode_id(&query.calendar_id));
        let resp = self.client.get(&path, &query.query_pairs()).await?;
        let events: EventsResponse = parse(resp)?;
        Ok(events.items.unwrap_or_default())
    }

    pub async fn insert_event(&self, calendar_id: &str, event: &NewEvent) -> Result<Event> {
        tracing::info!("Creating event '{}' in calendar: {}", event.summary, calendar_id);
        let path = format!("calendars/{}/events", encode_id(calendar_id));
        let body = serde_json::to_value(event)?;
        let resp = self.client.post(&path, &body).await?;
        parse(resp)
    }
}

fn parse<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ErrandError::upstream(format!("Unexpected Calendar response: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_omits_absent_time_bounds() {
        let query = EventQuery {
            calendar_id: "primary".to_string(),
            time_min: None,
            time_max: None,
            max_results: 10,
        };
        let keys: Vec<&str> = query.query_pairs().iter().map(|(k, _)| *k).collect();
        assert!(!keys.contains(&"timeMin"));
        assert!(!keys.contains(&"timeMax"));
        assert_eq!(keys, vec!["singleEvents", "orderBy", "maxResults"]);
    }

    #[test]
    fn it_includes_given_time_bounds() {
        let query = EventQuery {
            calendar_id: "primary".to_string(),
            time_min: Some("2025-01-01T00:00:00Z".to_string()),
            time_max: None,
            max_results: 5,
        };
        let pairs = query.query_pairs();
        assert!(pairs.contains(&("timeMin", "2025-01-01T00:00:00Z".to_string())));
        assert!(!pairs.iter().any(|(k, _)| *k == "timeMax"));
    }

    #[test]
    fn it_wraps_recurrence_rules_once() {
        assert_eq!(recurrence_line("FREQ=WEEKLY;COUNT=4"), "RRULE:FREQ=WEEKLY;COUNT=4");
        assert_eq!(recurrence_line("RRULE:FREQ=DAILY"), "RRULE:FREQ=DAILY");
        // Not validated, passed through as given
        assert_eq!(recurrence_line("every tuesday"), "RRULE:every tuesday");
    }

    #[test]
    fn it_serializes_only_present_event_fields() {
        let event = NewEvent {
            summary: "Standup".to_string(),
            description: None,
            location: None,
            start: EventTime::at("2025-03-03T09:00:00", "America/New_York"),
            end: EventTime::at("2025-03-03T09:15:00", "America/New_York"),
            attendees: None,
            color_id: "7".to_string(),
            recurrence: Some(vec![recurrence_line("FREQ=DAILY")]),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "summary": "Standup",
                "start": {"dateTime": "2025-03-03T09:00:00", "timeZone": "America/New_York"},
                "end": {"dateTime": "2025-03-03T09:15:00", "timeZone": "America/New_York"},
                "colorId": "7",
                "recurrence": ["RRULE:FREQ=DAILY"]
            })
        );
    }

    #[tokio::test]
    async fn it_lists_events_without_bounds() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/calendars/primary/events")
            .match_query(mockito::Matcher::Exact(
                "singleEvents=true&orderBy=startTime&maxResults=10".to_string(),
            ))
            .with_status(200)
            .with_body(
                r#"{"items": [{"id": "evt1", "summary": "Lunch", "start": {"dateTime": "2025-03-03T12:00:00Z"}, "end": {"dateTime": "2025-03-03T13:00:00Z"}}]}"#,
            )
            .create_async()
            .await;

        let api = CalendarApi::new(GoogleClient::new("token", &server.url()).unwrap());
        let events = api
            .list_events(&EventQuery {
                calendar_id: "primary".to_string(),
                time_min: None,
                time_max: None,
                max_results: 10,
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary.as_deref(), Some("Lunch"));
    }

    #[tokio::test]
    async fn it_encodes_calendar_ids_in_the_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/calendars/team%40group.calendar.google.com/events")
            .with_status(200)
            .with_body(r#"{"id": "new1", "summary": "Offsite"}"#)
            .create_async()
            .await;

        let api = CalendarApi::new(GoogleClient::new("token", &server.url()).unwrap());
        let event = NewEvent {
            summary: "Offsite".to_string(),
            description: None,
            location: None,
            start: EventTime::at("2025-03-03T09:00:00Z", "UTC"),
            end: EventTime::at("2025-03-03T17:00:00Z", "UTC"),
            attendees: None,
            color_id: "1".to_string(),
            recurrence: None,
        };
        let created = api
            .insert_event("team@group.calendar.google.com", &event)
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(created.id, "new1");
    }
}
