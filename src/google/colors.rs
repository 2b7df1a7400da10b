//! Automatic event colors. Google Calendar has a fixed palette of
//! eleven event colors ("1" Lavender .. "11" Tomato). When the caller
//! doesn't pick one, the event text is matched against keyword rules
//! and the first rule that hits decides the color.

pub const DEFAULT_COLOR: &str = "1";

pub struct ColorRule {
    pub category: &'static str,
    pub keywords: &'static [&'static str],
    pub color_id: &'static str,
}

/// Evaluated top to bottom. Urgency overrides everything, then work
/// (meetings before deadlines before general work), social, health,
/// learning and travel.
pub const COLOR_RULES: &[ColorRule] = &[
    ColorRule {
        category: "urgent",
        keywords: &["urgent", "asap", "critical", "emergency"],
        color_id: "11",
    },
    ColorRule {
        category: "work:meeting",
        keywords: &[
            "meeting",
            "standup",
            "stand-up",
            "sync",
            "1:1",
            "one-on-one",
            "interview",
            "call",
        ],
        color_id: "7",
    },
    ColorRule {
        category: "work:deadline",
        keywords: &["deadline", "due", "submission", "launch", "release"],
        color_id: "9",
    },
    ColorRule {
        category: "work:general",
        keywords: &["project", "office", "client", "presentation", "review", "report"],
        color_id: "8",
    },
    ColorRule {
        category: "social:celebration",
        keywords: &["birthday", "party", "wedding", "anniversary", "celebration"],
        color_id: "3",
    },
    ColorRule {
        category: "social:casual",
        keywords: &["dinner", "lunch", "brunch", "drinks", "coffee", "hangout", "friends"],
        color_id: "4",
    },
    ColorRule {
        category: "health:medical",
        keywords: &[
            "doctor",
            "dentist",
            "appointment",
            "medical",
            "therapy",
            "checkup",
            "hospital",
        ],
        color_id: "2",
    },
    ColorRule {
        category: "health:fitness",
        keywords: &["gym", "workout", "yoga", "exercise", "fitness", "running"],
        color_id: "10",
    },
    ColorRule {
        category: "learning",
        keywords: &["class", "course", "lecture", "study", "workshop", "webinar", "training"],
        color_id: "5",
    },
    ColorRule {
        category: "travel",
        keywords: &["trip", "travel", "vacation", "getaway", "flight", "hotel", "holiday"],
        color_id: "7",
    },
];

/// The rule matching this event text, if any.
pub fn matching_rule(summary: &str, description: Option<&str>) -> Option<&'static ColorRule> {
    let text = format!("{} {}", summary, description.unwrap_or_default()).to_lowercase();
    COLOR_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| text.contains(k)))
}

/// Pick a color id for an event from its title and description.
pub fn suggest_color(summary: &str, description: Option<&str>) -> &'static str {
    matching_rule(summary, description)
        .map(|rule| rule.color_id)
        .unwrap_or(DEFAULT_COLOR)
}

pub fn is_valid_color_id(color_id: &str) -> bool {
    matches!(color_id.parse::<u8>(), Ok(1..=11))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_colors_known_examples() {
        assert_eq!(suggest_color("Team standup meeting", None), "7");
        assert_eq!(suggest_color("Doctor appointment", None), "2");
        assert_eq!(suggest_color("Weekend getaway trip", None), "7");
        assert_eq!(suggest_color("", None), "1");
        assert_eq!(suggest_color("Pick up dry cleaning", None), "1");
    }

    #[test]
    fn it_keeps_work_events_in_the_work_palette() {
        let work = [
            "Quarterly planning meeting",
            "Tax filing deadline",
            "Client presentation",
            "Phone call with vendor",
            "Code review",
            "Product launch",
        ];
        for summary in work {
            let color = suggest_color(summary, None);
            assert!(
                ["7", "8", "9"].contains(&color),
                "{} got color {}",
                summary,
                color
            );
        }
    }

    #[test]
    fn it_applies_work_sub_rules_in_priority_order() {
        // Meeting outranks deadline, deadline outranks general work
        assert_eq!(suggest_color("Deadline review meeting", None), "7");
        assert_eq!(suggest_color("Project deadline", None), "9");
        assert_eq!(suggest_color("Project kickoff", None), "8");
    }

    #[test]
    fn it_lets_urgency_override_work() {
        assert_eq!(suggest_color("URGENT: server meeting", None), "11");
    }

    #[test]
    fn it_matches_the_description_case_insensitively() {
        assert_eq!(suggest_color("Saturday", Some("Yoga in the park")), "10");
        assert_eq!(suggest_color("Sam's BIRTHDAY", None), "3");
        assert_eq!(suggest_color("Intro to Rust", Some("online course")), "5");
        assert_eq!(suggest_color("Catch up", Some("coffee with Jo")), "4");
    }

    #[test]
    fn it_validates_color_ids() {
        assert!(is_valid_color_id("1"));
        assert!(is_valid_color_id("11"));
        assert!(!is_valid_color_id("0"));
        assert!(!is_valid_color_id("12"));
        assert!(!is_valid_color_id("blue"));
    }
}
