pub mod args;

pub mod calendar;
pub use calendar::{CreateEventTool, ListCalendarsTool, ListEventsTool};

pub mod email;
pub use email::{GetEmailTool, ListEmailsTool, SearchEmailsTool, SendEmailTool};

pub mod ordering;
pub use ordering::{BrowseMenuTool, CartAction, CartTool, OrderFoodItemTool};

use std::sync::Arc;

use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::tool_error_text;
use crate::google::GoogleApi;
use crate::openai::BoxedToolCall;
use crate::ordering::OrderingDriver;

/// Parameter schema for tools that take no arguments.
#[derive(Serialize)]
pub struct NoProps {}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoArgs {}

/// Failures become text the model can read and react to.
pub fn as_tool_text(name: String, result: Result<String>) -> Result<String, Error> {
    match result {
        Ok(content) => Ok(content),
        Err(e) => {
            tracing::warn!("Tool {} failed: {:#}", name, e);
            Ok(tool_error_text(&e))
        }
    }
}

/// Every tool the assistant offers the model.
pub fn registry(
    google: GoogleApi,
    driver: Arc<OrderingDriver>,
    default_time_zone: &str,
) -> Vec<BoxedToolCall> {
    vec![
        Box::new(ListCalendarsTool::new(google.clone())),
        Box::new(ListEventsTool::new(google.clone())),
        Box::new(CreateEventTool::new(google.clone(), default_time_zone)),
        Box::new(CreateEventTool::recurring(google.clone(), default_time_zone)),
        Box::new(ListEmailsTool::new(google.clone())),
        Box::new(GetEmailTool::new(google.clone())),
        Box::new(SendEmailTool::new(google.clone())),
        Box::new(SearchEmailsTool::new(google)),
        Box::new(BrowseMenuTool::new(driver.clone())),
        Box::new(OrderFoodItemTool::new(driver.clone())),
        Box::new(CartTool::new(driver.clone(), CartAction::Get)),
        Box::new(CartTool::new(driver.clone(), CartAction::Clear)),
        Box::new(CartTool::new(driver, CartAction::Checkout)),
    ]
}
