//! Argument parsing and validation shared by every tool. Everything here
//! runs before a network call or browser action and fails with
//! `ErrandError::Validation`.

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::de::DeserializeOwned;

use crate::core::ErrandError;
use crate::ordering::MAX_QUANTITY;

pub const DEFAULT_MAX_RESULTS: u32 = 10;
const MAX_RESULTS_LIMIT: u32 = 500;
const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Deserialize the model's JSON arguments. Some models send an empty
/// string for tools without parameters.
pub fn parse<T: DeserializeOwned>(args: &str) -> Result<T> {
    let args = if args.trim().is_empty() { "{}" } else { args };
    serde_json::from_str(args).map_err(|e| ErrandError::validation(e.to_string()).into())
}

pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ErrandError::validation(format!("`{}` must not be blank", field)).into());
    }
    Ok(())
}

pub fn max_results(value: Option<u32>) -> Result<u32> {
    let value = value.unwrap_or(DEFAULT_MAX_RESULTS);
    if !(1..=MAX_RESULTS_LIMIT).contains(&value) {
        return Err(ErrandError::validation(format!(
            "`maxResults` must be between 1 and {}, got {}",
            MAX_RESULTS_LIMIT, value
        ))
        .into());
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Offset(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

/// Accepts RFC3339 or a local `YYYY-MM-DDTHH:MM:SS` that is interpreted
/// in the event's time zone.
pub fn timestamp(field: &str, value: &str) -> Result<Timestamp> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Timestamp::Offset(dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, LOCAL_FORMAT) {
        return Ok(Timestamp::Local(dt));
    }
    Err(ErrandError::validation(format!(
        "`{}` must be RFC3339 or YYYY-MM-DDTHH:MM:SS, got '{}'",
        field, value
    ))
    .into())
}

/// Time bounds for listing must carry an offset.
pub fn rfc3339(field: &str, value: &str) -> Result<()> {
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(_) => Ok(()),
        Err(_) => Err(ErrandError::validation(format!(
            "`{}` must be an RFC3339 timestamp, got '{}'",
            field, value
        ))
        .into()),
    }
}

/// Comparison only happens when both sides are the same kind.
pub fn ordered(start: &Timestamp, end: &Timestamp) -> Result<()> {
    let reversed = match (start, end) {
        (Timestamp::Offset(s), Timestamp::Offset(e)) => e < s,
        (Timestamp::Local(s), Timestamp::Local(e)) => e < s,
        _ => false,
    };
    if reversed {
        return Err(ErrandError::validation("`end` must not be before `start`").into());
    }
    Ok(())
}

pub fn color_id(value: &str) -> Result<()> {
    if !crate::google::colors::is_valid_color_id(value) {
        return Err(ErrandError::validation(format!(
            "`colorId` must be \"1\" through \"11\", got '{}'",
            value
        ))
        .into());
    }
    Ok(())
}

/// Values that end up in a mail header must stay on one line.
pub fn header(field: &str, value: &str) -> Result<()> {
    require(field, value)?;
    if value.contains(['\r', '\n']) {
        return Err(
            ErrandError::validation(format!("`{}` must not contain line breaks", field)).into(),
        );
    }
    Ok(())
}

/// A comma separated list of addresses; each must look like an address.
pub fn emails(field: &str, value: &str) -> Result<()> {
    header(field, value)?;
    for address in value.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        if !address.contains('@') {
            return Err(ErrandError::validation(format!(
                "`{}` contains an invalid email address '{}'",
                field, address
            ))
            .into());
        }
    }
    Ok(())
}

/// Exactly one address, e.g. a single attendee.
pub fn email(field: &str, value: &str) -> Result<()> {
    emails(field, value)?;
    if value.contains(',') {
        return Err(ErrandError::validation(format!(
            "`{}` entries must be one address each, got '{}'",
            field,
            value.trim()
        ))
        .into());
    }
    Ok(())
}

/// `quantity` defaults to 1 and is capped at `MAX_QUANTITY`.
pub fn quantity(value: Option<u32>) -> Result<u32> {
    let value = value.unwrap_or(1);
    if value < 1 {
        return Err(ErrandError::validation("`quantity` must be at least 1").into());
    }
    if value > MAX_QUANTITY {
        return Err(ErrandError::validation(format!(
            "`quantity` must be at most {}, got {}",
            MAX_QUANTITY, value
        ))
        .into());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct Sample {
        name: String,
    }

    fn is_validation(err: &anyhow::Error) -> bool {
        matches!(err.downcast_ref::<ErrandError>(), Some(ErrandError::Validation(_)))
    }

    #[test]
    fn it_rejects_malformed_arguments() {
        let err = parse::<Sample>(r#"{"nam": "x"}"#).unwrap_err();
        assert!(is_validation(&err));
        assert!(err.to_string().contains("missing field `name`"));
        assert_eq!(parse::<Sample>(r#"{"name": "x"}"#).unwrap().name, "x");
    }

    #[test]
    fn it_treats_empty_arguments_as_an_empty_object() {
        #[derive(Deserialize)]
        struct Empty {}
        assert!(parse::<Empty>("").is_ok());
    }

    #[test]
    fn it_bounds_max_results() {
        assert_eq!(max_results(None).unwrap(), 10);
        assert_eq!(max_results(Some(500)).unwrap(), 500);
        assert!(is_validation(&max_results(Some(0)).unwrap_err()));
        assert!(is_validation(&max_results(Some(501)).unwrap_err()));
    }

    #[test]
    fn it_parses_both_timestamp_forms() {
        assert!(matches!(
            timestamp("start", "2025-03-03T09:00:00-05:00").unwrap(),
            Timestamp::Offset(_)
        ));
        assert!(matches!(
            timestamp("start", "2025-03-03T09:00:00").unwrap(),
            Timestamp::Local(_)
        ));
        assert!(is_validation(&timestamp("start", "tomorrow at 9").unwrap_err()));
    }

    #[test]
    fn it_rejects_end_before_start() {
        let start = timestamp("start", "2025-03-03T10:00:00").unwrap();
        let end = timestamp("end", "2025-03-03T09:00:00").unwrap();
        assert!(is_validation(&ordered(&start, &end).unwrap_err()));
        // Mixed kinds are not compared
        let end = timestamp("end", "2025-03-03T09:00:00Z").unwrap();
        assert!(ordered(&start, &end).is_ok());
    }

    #[test]
    fn it_validates_addresses() {
        assert!(emails("to", "a@example.com, b@example.com").is_ok());
        assert!(is_validation(&emails("to", "a@example.com, bob").unwrap_err()));
        assert!(is_validation(&emails("to", "  ").unwrap_err()));
    }

    #[test]
    fn it_rejects_line_breaks_in_header_values() {
        let err = emails("to", "ana@example.com\r\nBcc: spy@evil.example").unwrap_err();
        assert!(is_validation(&err));
        assert!(err.to_string().contains("line breaks"));
        assert!(is_validation(&header("subject", "Hi\nBcc: spy@evil.example").unwrap_err()));
        assert!(header("subject", "Lunch on Friday?").is_ok());
    }

    #[test]
    fn it_requires_single_addresses() {
        assert!(email("attendees", " ana@example.com ").is_ok());
        let err = email("attendees", "a@x.com, b@y.com").unwrap_err();
        assert!(is_validation(&err));
        assert!(err.to_string().contains("one address each"));
    }

    #[test]
    fn it_bounds_quantity() {
        assert_eq!(quantity(None).unwrap(), 1);
        assert_eq!(quantity(Some(MAX_QUANTITY)).unwrap(), MAX_QUANTITY);
        assert!(is_validation(&quantity(Some(0)).unwrap_err()));
        let err = quantity(Some(4_000_000_000)).unwrap_err();
        assert!(err.to_string().contains("at most 99"));
    }

    #[test]
    fn it_rejects_unknown_fields_when_denied() {
        #[derive(Deserialize, Debug)]
        #[serde(deny_unknown_fields)]
        struct Strict {
            #[allow(dead_code)]
            name: String,
        }
        let err = parse::<Strict>(r#"{"name": "x", "nmae": "y"}"#).unwrap_err();
        assert!(is_validation(&err));
        assert!(err.to_string().contains("unknown field `nmae`"));
    }

    #[test]
    fn it_validates_color_ids() {
        assert!(color_id("11").is_ok());
        assert!(is_validation(&color_id("12").unwrap_err()));
    }
}
