//! Text rendering of tool results using Handlebars templates. The
//! model reads these, so output is plain markdown-ish text and HTML
//! escaping is turned off.

use std::fmt;

use anyhow::Result;
use handlebars::{Handlebars, handlebars_helper, no_escape};
use serde::Serialize;

// A simple `inc` helper for use with `each` and `@index` so that
// numbered lists start at 1.
handlebars_helper!(inc: |v: i64| format!("{}", v + 1));

#[derive(Debug, Clone, Copy)]
pub enum Prompt {
    CalendarList,
    EventList,
    CreatedEvent,
    EmailList,
    EmailDetail,
    SentEmail,
    Menu,
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

const CALENDAR_LIST_PROMPT: &str = r"
# Calendars
{{#each calendars}}
{{inc @index}}. {{summary}} (ID: {{id}}){{#if primary}} [primary]{{/if}}{{#if time_zone}} - {{time_zone}}{{/if}}
{{/each}}
";

const EVENT_LIST_PROMPT: &str = r"
# Events in {{calendar_id}}
{{#each events}}

## {{summary}}

**ID:** {{id}}
**Start:** {{start}}
**End:** {{end}}
{{#if location}}
**Location:** {{location}}
{{/if}}
{{#if attendees}}
**Attendees:** {{attendees}}
{{/if}}
{{#if description}}
**Description:** {{description}}
{{/if}}
{{/each}}
";

const CREATED_EVENT_PROMPT: &str = r"
Created {{#if recurring}}recurring {{/if}}event '{{summary}}' in {{calendar_id}}.

**ID:** {{id}}
**Start:** {{start}}
**End:** {{end}}
**Color:** {{color_id}}
{{#if recurrence}}
**Recurrence:** {{recurrence}}
{{/if}}
{{#if link}}
**Link:** {{link}}
{{/if}}
";

const EMAIL_LIST_PROMPT: &str = r"
# Emails
{{#each emails}}

## {{subject}}

**ID:** {{id}}
**Thread ID:** {{thread_id}}
**From:** {{from}}
**To:** {{to}}
**Date:** {{date}}
**Snippet:** {{snippet}}
{{/each}}
";

const EMAIL_DETAIL_PROMPT: &str = r"
# {{subject}}

**ID:** {{id}}
**Thread ID:** {{thread_id}}
**From:** {{from}}
**To:** {{to}}
**Date:** {{date}}
**Labels:** {{labels}}
**Body:**
{{body}}
";

const SENT_EMAIL_PROMPT: &str = r"
Email sent to {{to}} with subject '{{subject}}'.

**Message ID:** {{id}}
**Thread ID:** {{thread_id}}
";

const MENU_PROMPT: &str = r"
# Menu{{#if category}} ({{category}}){{/if}}
{{#each items}}
{{inc @index}}. {{name}}{{#if price}} - {{price}}{{/if}}{{#unless available}} [unavailable]{{/unless}}
{{#if description}}
   {{description}}
{{/if}}
{{/each}}
{{#if screenshot_path}}

Screenshot: {{screenshot_path}}
{{/if}}
";

pub fn templates<'a>() -> Result<Handlebars<'a>> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry.register_escape_fn(no_escape);
    registry.register_helper("inc", Box::new(inc));

    let all = [
        (Prompt::CalendarList, CALENDAR_LIST_PROMPT),
        (Prompt::EventList, EVENT_LIST_PROMPT),
        (Prompt::CreatedEvent, CREATED_EVENT_PROMPT),
        (Prompt::EmailList, EMAIL_LIST_PROMPT),
        (Prompt::EmailDetail, EMAIL_DETAIL_PROMPT),
        (Prompt::SentEmail, SENT_EMAIL_PROMPT),
        (Prompt::Menu, MENU_PROMPT),
    ];
    for (prompt, template) in all {
        registry.register_template_string(&prompt.to_string(), template)?;
    }
    Ok(registry)
}

/// Render one of the templates and trim the surrounding whitespace.
pub fn render<T: Serialize>(prompt: Prompt, data: &T) -> Result<String> {
    let content = templates()?.render(&prompt.to_string(), data)?;
    Ok(content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn it_registers_every_template() {
        let registry = templates().unwrap();
        for prompt in [Prompt::CalendarList, Prompt::EventList, Prompt::Menu] {
            assert!(registry.has_template(&prompt.to_string()));
        }
    }

    #[test]
    fn it_renders_calendars_without_escaping() {
        let out = render(
            Prompt::CalendarList,
            &json!({"calendars": [
                {"id": "primary", "summary": "Me & Work", "primary": true, "time_zone": "UTC"},
                {"id": "fam@group", "summary": "Family", "primary": null, "time_zone": null}
            ]}),
        )
        .unwrap();
        assert_eq!(
            out,
            "# Calendars\n1. Me & Work (ID: primary) [primary] - UTC\n2. Family (ID: fam@group)"
        );
    }

    #[test]
    fn it_fails_on_missing_fields_in_strict_mode() {
        assert!(render(Prompt::SentEmail, &json!({"to": "a@b.c"})).is_err());
    }
}
