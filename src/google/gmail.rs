//! Gmail API client for listing, reading, searching and sending mail.
//! Message bodies are decoded from Gmail's base64url parts, preferring
//! plain text and converting HTML to markdown otherwise.

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE};
use htmd::HtmlToMarkdown;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::client::GoogleClient;
use crate::core::ErrandError;

pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Message and thread structures from Gmail API documentation
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MessageResponse {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Option<Vec<MessageResponse>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "threadId")]
    pub thread_id: String,
    pub snippet: Option<String>,
    pub payload: Option<MessagePayload>,
    #[serde(rename = "labelIds")]
    pub label_ids: Option<Vec<String>>,
    #[serde(rename = "internalDate")]
    pub internal_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePartBody {
    #[serde(rename = "attachmentId")]
    attachment_id: Option<String>,
    // Base64 encoded
    data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePart {
    #[serde(rename = "mimeType")]
    pub mimetype: String,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub headers: Option<Vec<MessageHeader>>,
    #[serde(rename = "mimeType")]
    pub mimetype: String,
    pub body: Option<MessagePartBody>,
    pub parts: Option<Vec<MessagePart>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    pub name: String,
    pub value: String,
}

/// Header fields plus snippet, as shown in a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailSummary {
    pub id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    pub snippet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDetail {
    #[serde(flatten)]
    pub summary: EmailSummary,
    pub labels: Vec<String>,
    pub body: String,
}

impl From<&Message> for EmailSummary {
    fn from(message: &Message) -> Self {
        EmailSummary {
            id: message.id.clone(),
            thread_id: message.thread_id.clone(),
            subject: extract_header(message, "Subject"),
            from: extract_header(message, "From"),
            to: extract_header(message, "To"),
            date: extract_header(message, "Date"),
            snippet: message.snippet.clone().map(|s| html_unescape(&s)).unwrap_or_default(),
        }
    }
}

impl From<&Message> for EmailDetail {
    fn from(message: &Message) -> Self {
        EmailDetail {
            summary: EmailSummary::from(message),
            labels: message.label_ids.clone().unwrap_or_default(),
            body: extract_body(message),
        }
    }
}

fn decode_base64(data: &str) -> String {
    // Gmail pads inconsistently so strip it and decode without
    let trimmed = data.trim_end_matches('=');
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_else(|| {
            tracing::error!("Base64 decode failed for: {}", data);
            String::from("Failed to decode")
        })
}

// Snippets come back with HTML entities escaped
fn html_unescape(input: &str) -> String {
    input
        .replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn html_to_markdown(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(vec!["script", "style", "footer", "img", "svg"])
        .build();
    converter.convert(html).unwrap_or_else(|e| {
        tracing::warn!("HTML to markdown conversion failed: {}", e);
        html.to_string()
    })
}

fn part_data(body: &Option<MessagePartBody>) -> Option<&str> {
    body.as_ref()
        .filter(|b| b.attachment_id.is_none())
        .and_then(|b| b.data.as_deref())
        .filter(|d| !d.is_empty())
}

/// Depth-first search for the first non-attachment part of a mime type.
fn find_part<'a>(parts: &'a [MessagePart], mimetype: &str) -> Option<&'a str> {
    for part in parts {
        if part.mimetype == mimetype
            && let Some(data) = part_data(&part.body)
        {
            return Some(data);
        }
        if let Some(children) = &part.parts
            && let Some(data) = find_part(children, mimetype)
        {
            return Some(data);
        }
    }
    None
}

/// Extract the body from the Gmail API message payload.
///
/// - The message either has a `payload.body.data` or one or more
///   (possibly nested) `parts[].body.data`.
/// - Plain text is preferred over HTML; HTML becomes markdown.
/// - Parts with an `attachmentId` are attachments and skipped.
pub fn extract_body(message: &Message) -> String {
    if let Some(payload) = &message.payload {
        if let Some(data) = part_data(&payload.body) {
            let decoded = decode_base64(data);
            if payload.mimetype == "text/html" {
                return html_to_markdown(&decoded);
            }
            return decoded.trim().to_string();
        }

        if let Some(parts) = &payload.parts {
            if let Some(data) = find_part(parts, "text/plain") {
                return decode_base64(data).trim().to_string();
            }
            if let Some(data) = find_part(parts, "text/html") {
                return html_to_markdown(&decode_base64(data));
            }
        }
    }

    // Fall back to the snippet
    if let Some(snippet) = &message.snippet {
        return html_unescape(snippet);
    }

    tracing::warn!(
        "Body was empty for message with ID: {} in thread: {}",
        message.id,
        message.thread_id
    );
    String::new()
}

/// The value of a header, matched case-insensitively.
pub fn extract_header(message: &Message, name: &str) -> String {
    message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_ref())
        .and_then(|headers| headers.iter().find(|h| h.name.eq_ignore_ascii_case(name)))
        .map(|h| h.value.clone())
        .unwrap_or_default()
}

// RFC 2047 encoded-word for non-ASCII subjects
fn encode_subject(subject: &str) -> String {
    if subject.is_ascii() {
        subject.to_string()
    } else {
        format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
    }
}

/// A new plain text message.
#[derive(Debug, Clone, Default)]
pub struct OutgoingEmail {
    pub to: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingEmail {
    /// Render the RFC 2822 message Gmail expects in the `raw` field.
    pub fn to_rfc2822(&self) -> String {
        let mut headers = vec![format!("To: {}", self.to)];
        if let Some(cc) = self.cc.as_ref().filter(|c| !c.trim().is_empty()) {
            headers.push(format!("Cc: {}", cc));
        }
        if let Some(bcc) = self.bcc.as_ref().filter(|b| !b.trim().is_empty()) {
            headers.push(format!("Bcc: {}", bcc));
        }
        headers.push(format!("Subject: {}", encode_subject(&self.subject)));
        headers.push("MIME-Version: 1.0".to_string());
        headers.push("Content-Type: text/plain; charset=\"UTF-8\"".to_string());
        headers.push("Content-Transfer-Encoding: 8bit".to_string());
        format!("{}\r\n\r\n{}", headers.join("\r\n"), self.body)
    }

    pub fn to_raw(&self) -> String {
        URL_SAFE.encode(self.to_rfc2822().as_bytes())
    }
}

/// Which messages to list: by label, by search query, or both.
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    pub label_ids: Vec<String>,
    pub q: Option<String>,
    pub max_results: u32,
}

impl MessageQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("maxResults", self.max_results.to_string())];
        for label in self.label_ids.iter() {
            pairs.push(("labelIds", label.clone()));
        }
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        pairs
    }
}

pub struct GmailApi {
    client: GoogleClient,
}

impl GmailApi {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }

    pub async fn list_messages(&self, query: &MessageQuery) -> Result<Vec<MessageResponse>> {
        let resp = self
            .client
            .get("users/me/messages", &query.query_pairs())
            .await?;
        let list: ListMessagesResponse = parse(resp)?;
        Ok(list.messages.unwrap_or_default())
    }

    /// Headers and snippet only.
    pub async fn get_metadata(&self, id: &str) -> Result<Message> {
        let query = [
            ("format", "metadata".to_string()),
            ("metadataHeaders", "Subject".to_string()),
            ("metadataHeaders", "From".to_string()),
            ("metadataHeaders", "To".to_string()),
            ("metadataHeaders", "Date".to_string()),
        ];
        let path = format!("users/me/messages/{}", urlencoding::encode(id));
        parse(self.client.get(&path, &query).await?)
    }

    pub async fn get_full(&self, id: &str) -> Result<Message> {
        let path = format!("users/me/messages/{}", urlencoding::encode(id));
        parse(self.client.get(&path, &[("format", "full".to_string())]).await?)
    }

    /// List and then fetch metadata for each message, in listing order.
    pub async fn summaries(&self, query: &MessageQuery) -> Result<Vec<EmailSummary>> {
        let mut out = vec![];
        for msg in self.list_messages(query).await? {
            let message = self.get_metadata(&msg.id).await?;
            out.push(EmailSummary::from(&message));
        }
        Ok(out)
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<MessageResponse> {
        tracing::info!("Sending email to {}", email.to);
        let body = json!({ "raw": email.to_raw() });
        parse(self.client.post("users/me/messages/send", &body).await?)
    }
}

fn parse<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ErrandError::upstream(format!("Unexpected Gmail response: {}", e)).into())
}
