use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{NoArgs, NoProps, args, as_tool_text};
use crate::ai::prompt::{self, Prompt};
use crate::core::ErrandError;
use crate::google::GoogleApi;
use crate::google::colors::suggest_color;
use crate::google::gcal::{Attendee, Event, EventQuery, EventTime, NewEvent, recurrence_line};
use crate::openai::{Function, Property, ToolCall, ToolType};

#[derive(Serialize)]
pub struct ListCalendarsTool {
    pub r#type: ToolType,
    pub function: Function<NoProps>,
    #[serde(skip)]
    google: GoogleApi,
}

#[async_trait]
impl ToolCall for ListCalendarsTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl ListCalendarsTool {
    pub fn new(google: GoogleApi) -> Self {
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "list_calendars",
                "List the Google calendars the user has access to.",
                NoProps {},
                &[],
            ),
            google,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let _: NoArgs = args::parse(args)?;
        let calendars = self.google.calendar().await?.list_calendars().await?;
        if calendars.is_empty() {
            return Ok("No calendars found.".to_string());
        }
        let calendars: Vec<_> = calendars
            .iter()
            .map(|c| {
                json!({
                    "id": c.id,
                    "summary": c.summary.clone().unwrap_or_else(|| c.id.clone()),
                    "primary": c.primary.unwrap_or(false),
                    "time_zone": c.time_zone,
                })
            })
            .collect();
        prompt::render(Prompt::CalendarList, &json!({ "calendars": calendars }))
    }
}

#[derive(Serialize)]
pub struct ListEventsProps {
    #[serde(rename = "calendarId")]
    pub calendar_id: Property,
    #[serde(rename = "timeMin")]
    pub time_min: Property,
    #[serde(rename = "timeMax")]
    pub time_max: Property,
    #[serde(rename = "maxResults")]
    pub max_results: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListEventsArgs {
    pub calendar_id: Option<String>,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Serialize)]
pub struct ListEventsTool {
    pub r#type: ToolType,
    pub function: Function<ListEventsProps>,
    #[serde(skip)]
    google: GoogleApi,
}

#[async_trait]
impl ToolCall for ListEventsTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl ListEventsTool {
    pub fn new(google: GoogleApi) -> Self {
        let properties = ListEventsProps {
            calendar_id: Property::string("Calendar ID to list events from (default 'primary')."),
            time_min: Property::string(
                "Lower bound (inclusive) for an event's end time as an RFC3339 timestamp, e.g. 2025-03-01T00:00:00Z.",
            ),
            time_max: Property::string(
                "Upper bound (exclusive) for an event's start time as an RFC3339 timestamp.",
            ),
            max_results: Property::integer("Maximum number of events to return (default 10)."),
        };
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "list_events",
                "List events from a Google calendar ordered by start time.",
                properties,
                &[],
            ),
            google,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let fn_args: ListEventsArgs = args::parse(args)?;
        let calendar_id = non_blank(fn_args.calendar_id).unwrap_or_else(|| "primary".to_string());
        let time_min = non_blank(fn_args.time_min);
        let time_max = non_blank(fn_args.time_max);
        if let Some(min) = &time_min {
            args::rfc3339("timeMin", min)?;
        }
        if let Some(max) = &time_max {
            args::rfc3339("timeMax", max)?;
        }
        let query = EventQuery {
            calendar_id: calendar_id.clone(),
            time_min,
            time_max,
            max_results: args::max_results(fn_args.max_results)?,
        };

        let events = self.google.calendar().await?.list_events(&query).await?;
        if events.is_empty() {
            return Ok(format!("No events found in {}.", calendar_id));
        }
        let events: Vec<_> = events.iter().map(event_view).collect();
        prompt::render(
            Prompt::EventList,
            &json!({ "calendar_id": calendar_id, "events": events }),
        )
    }
}

fn event_view(event: &Event) -> serde_json::Value {
    let attendees = event.attendees.as_ref().map(|attendees| {
        attendees
            .iter()
            .map(|a| match &a.display_name {
                Some(name) => format!("{} <{}>", name, a.email),
                None => a.email.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    });
    json!({
        "id": event.id,
        "summary": event.summary.clone().unwrap_or_else(|| "(no title)".to_string()),
        "start": event.start.as_ref().map(EventTime::display).unwrap_or_default(),
        "end": event.end.as_ref().map(EventTime::display).unwrap_or_default(),
        "location": event.location,
        "attendees": attendees,
        "description": event.description,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Serialize)]
pub struct CreateEventProps {
    pub summary: Property,
    pub start: Property,
    pub end: Property,
    #[serde(rename = "calendarId")]
    pub calendar_id: Property,
    pub description: Property,
    pub location: Property,
    pub attendees: Property,
    #[serde(rename = "timeZone")]
    pub time_zone: Property,
    #[serde(rename = "colorId")]
    pub color_id: Property,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Property>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateEventArgs {
    pub summary: String,
    pub start: String,
    pub end: String,
    pub calendar_id: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<Vec<String>>,
    pub time_zone: Option<String>,
    pub color_id: Option<String>,
    pub recurrence: Option<String>,
}

impl CreateEventProps {
    fn new(recurring: bool) -> Self {
        Self {
            summary: Property::string("Title of the event."),
            start: Property::string(
                "Start time, RFC3339 or YYYY-MM-DDTHH:MM:SS in the event's time zone.",
            ),
            end: Property::string("End time, same format as start."),
            calendar_id: Property::string("Calendar ID to create the event in (default 'primary')."),
            description: Property::string("Longer description of the event."),
            location: Property::string("Where the event takes place."),
            attendees: Property::string_array("Email addresses of people to invite."),
            time_zone: Property::string("IANA time zone for start and end, e.g. America/New_York."),
            color_id: Property::string(
                "Event color \"1\" through \"11\". Chosen automatically from the title and description when omitted.",
            ),
            recurrence: recurring.then(|| {
                Property::string(
                    "Recurrence rule in RRULE syntax, e.g. FREQ=WEEKLY;BYDAY=MO;COUNT=10.",
                )
            }),
        }
    }
}

/// Shared by `create_event` and `create_recurring_event`.
#[derive(Serialize)]
pub struct CreateEventTool {
    pub r#type: ToolType,
    pub function: Function<CreateEventProps>,
    #[serde(skip)]
    google: GoogleApi,
    #[serde(skip)]
    default_time_zone: String,
    #[serde(skip)]
    recurring: bool,
}

#[async_trait]
impl ToolCall for CreateEventTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl CreateEventTool {
    pub fn new(google: GoogleApi, default_time_zone: &str) -> Self {
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "create_event",
                "Create a single event on a Google calendar.",
                CreateEventProps::new(false),
                &["summary", "start", "end"],
            ),
            google,
            default_time_zone: default_time_zone.to_string(),
            recurring: false,
        }
    }

    pub fn recurring(google: GoogleApi, default_time_zone: &str) -> Self {
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "create_recurring_event",
                "Create a repeating event on a Google calendar from an RRULE.",
                CreateEventProps::new(true),
                &["summary", "start", "end", "recurrence"],
            ),
            google,
            default_time_zone: default_time_zone.to_string(),
            recurring: true,
        }
    }

    /// Validate arguments and build the request body without touching
    /// the network.
    pub fn build(&self, fn_args: CreateEventArgs) -> Result<(String, NewEvent)> {
        args::require("summary", &fn_args.summary)?;
        let start = args::timestamp("start", &fn_args.start)?;
        let end = args::timestamp("end", &fn_args.end)?;
        args::ordered(&start, &end)?;

        let recurrence = match (self.recurring, fn_args.recurrence) {
            (true, rule) => {
                let rule = rule.unwrap_or_default();
                args::require("recurrence", &rule)?;
                Some(vec![recurrence_line(&rule)])
            }
            (false, None) => None,
            (false, Some(_)) => {
                return Err(ErrandError::validation(
                    "unknown field `recurrence`, use create_recurring_event for repeating events",
                )
                .into());
            }
        };

        let attendees = match fn_args.attendees.filter(|a| !a.is_empty()) {
            Some(emails) => {
                for email in emails.iter() {
                    args::email("attendees", email)?;
                }
                Some(
                    emails
                        .into_iter()
                        .map(|email| Attendee {
                            email: email.trim().to_string(),
                            display_name: None,
                            response_status: None,
                        })
                        .collect(),
                )
            }
            None => None,
        };

        let description = non_blank(fn_args.description);
        let color_id = match non_blank(fn_args.color_id) {
            Some(color_id) => {
                args::color_id(&color_id)?;
                color_id
            }
            None => suggest_color(&fn_args.summary, description.as_deref()).to_string(),
        };

        let time_zone =
            non_blank(fn_args.time_zone).unwrap_or_else(|| self.default_time_zone.clone());
        let calendar_id = non_blank(fn_args.calendar_id).unwrap_or_else(|| "primary".to_string());

        let event = NewEvent {
            summary: fn_args.summary.trim().to_string(),
            description,
            location: non_blank(fn_args.location),
            start: EventTime::at(fn_args.start.trim(), &time_zone),
            end: EventTime::at(fn_args.end.trim(), &time_zone),
            attendees,
            color_id,
            recurrence,
        };
        Ok((calendar_id, event))
    }

    async fn run(&self, args: &str) -> Result<String> {
        let fn_args: CreateEventArgs = args::parse(args)?;
        let (calendar_id, event) = self.build(fn_args)?;
        let created = self
            .google
            .calendar()
            .await?
            .insert_event(&calendar_id, &event)
            .await?;

        // Prefer what Google stored, fall back to what was sent
        let start = created.start.as_ref().unwrap_or(&event.start).display();
        let end = created.end.as_ref().unwrap_or(&event.end).display();
        prompt::render(
            Prompt::CreatedEvent,
            &json!({
                "recurring": self.recurring,
                "summary": created.summary.clone().unwrap_or(event.summary.clone()),
                "calendar_id": calendar_id,
                "id": created.id,
                "start": start,
                "end": end,
                "color_id": created.color_id.clone().unwrap_or(event.color_id.clone()),
                "recurrence": event.recurrence.as_ref().map(|r| r.join(", ")),
                "link": created.html_link,
            }),
        )
    }
}
