pub mod client;
pub mod colors;
pub mod gcal;
pub mod gmail;
pub mod oauth;

use std::sync::Arc;

use anyhow::Result;

use client::GoogleClient;
use gcal::{CALENDAR_API_BASE, CalendarApi};
use gmail::{GMAIL_API_BASE, GmailApi};
use oauth::GoogleAuth;

/// Entry point for Google operations. Each call to `calendar()` or
/// `gmail()` fetches a fresh access token from the persisted refresh
/// token, so nothing is cached between tool calls.
#[derive(Clone)]
pub struct GoogleApi {
    auth: Arc<GoogleAuth>,
    calendar_base_url: String,
    gmail_base_url: String,
}

impl GoogleApi {
    pub fn new(auth: GoogleAuth) -> Self {
        Self::with_base_urls(auth, CALENDAR_API_BASE, GMAIL_API_BASE)
    }

    pub fn with_base_urls(auth: GoogleAuth, calendar_base_url: &str, gmail_base_url: &str) -> Self {
        Self {
            auth: Arc::new(auth),
            calendar_base_url: calendar_base_url.to_string(),
            gmail_base_url: gmail_base_url.to_string(),
        }
    }

    pub async fn calendar(&self) -> Result<CalendarApi> {
        let token = self.auth.access_token().await?;
        Ok(CalendarApi::new(GoogleClient::new(&token, &self.calendar_base_url)?))
    }

    pub async fn gmail(&self) -> Result<GmailApi> {
        let token = self.auth.access_token().await?;
        Ok(GmailApi::new(GoogleClient::new(&token, &self.gmail_base_url)?))
    }
}
