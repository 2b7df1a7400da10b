use anyhow::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{args, as_tool_text};
use crate::ai::prompt::{self, Prompt};
use crate::google::GoogleApi;
use crate::google::gmail::{EmailDetail, EmailSummary, MessageQuery, OutgoingEmail};
use crate::openai::{Function, Property, ToolCall, ToolType};

fn render_summaries(emails: &[EmailSummary]) -> Result<String> {
    if emails.is_empty() {
        return Ok("No emails found.".to_string());
    }
    prompt::render(Prompt::EmailList, &json!({ "emails": emails }))
}

#[derive(Serialize)]
pub struct ListEmailsProps {
    #[serde(rename = "maxResults")]
    pub max_results: Property,
    #[serde(rename = "labelIds")]
    pub label_ids: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListEmailsArgs {
    pub max_results: Option<u32>,
    pub label_ids: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct ListEmailsTool {
    pub r#type: ToolType,
    pub function: Function<ListEmailsProps>,
    #[serde(skip)]
    google: GoogleApi,
}

#[async_trait]
impl ToolCall for ListEmailsTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl ListEmailsTool {
    pub fn new(google: GoogleApi) -> Self {
        let properties = ListEmailsProps {
            max_results: Property::integer("Maximum number of emails to return (default 10)."),
            label_ids: Property::string_array(
                "Only return messages with all of these labels (default [\"INBOX\"]).",
            ),
        };
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "list_emails",
                "List recent Gmail messages with subject, sender, recipient, date and snippet.",
                properties,
                &[],
            ),
            google,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let fn_args: ListEmailsArgs = args::parse(args)?;
        let label_ids = fn_args
            .label_ids
            .map(|labels| {
                labels
                    .into_iter()
                    .filter(|l| !l.trim().is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|labels| !labels.is_empty())
            .unwrap_or_else(|| vec!["INBOX".to_string()]);
        let query = MessageQuery {
            label_ids,
            q: None,
            max_results: args::max_results(fn_args.max_results)?,
        };
        let emails = self.google.gmail().await?.summaries(&query).await?;
        render_summaries(&emails)
    }
}

#[derive(Serialize)]
pub struct SearchEmailsProps {
    pub query: Property,
    #[serde(rename = "maxResults")]
    pub max_results: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchEmailsArgs {
    pub query: String,
    pub max_results: Option<u32>,
}

#[derive(Serialize)]
pub struct SearchEmailsTool {
    pub r#type: ToolType,
    pub function: Function<SearchEmailsProps>,
    #[serde(skip)]
    google: GoogleApi,
}

#[async_trait]
impl ToolCall for SearchEmailsTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl SearchEmailsTool {
    pub fn new(google: GoogleApi) -> Self {
        let properties = SearchEmailsProps {
            query: Property::string(
                "Gmail search query, e.g. 'from:alice@example.com is:unread newer_than:7d'.",
            ),
            max_results: Property::integer("Maximum number of emails to return (default 10)."),
        };
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "search_emails",
                "Search Gmail using Gmail's search syntax.",
                properties,
                &["query"],
            ),
            google,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let fn_args: SearchEmailsArgs = args::parse(args)?;
        args::require("query", &fn_args.query)?;
        let query = MessageQuery {
            label_ids: vec![],
            q: Some(fn_args.query.trim().to_string()),
            max_results: args::max_results(fn_args.max_results)?,
        };
        let emails = self.google.gmail().await?.summaries(&query).await?;
        render_summaries(&emails)
    }
}

#[derive(Serialize)]
pub struct GetEmailProps {
    #[serde(rename = "messageId")]
    pub message_id: Property,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GetEmailArgs {
    pub message_id: String,
}

#[derive(Serialize)]
pub struct GetEmailTool {
    pub r#type: ToolType,
    pub function: Function<GetEmailProps>,
    #[serde(skip)]
    google: GoogleApi,
}

#[async_trait]
impl ToolCall for GetEmailTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl GetEmailTool {
    pub fn new(google: GoogleApi) -> Self {
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "get_email",
                "Fetch a single Gmail message including its body.",
                GetEmailProps {
                    message_id: Property::string("ID of the message, as returned by list_emails."),
                },
                &["messageId"],
            ),
            google,
        }
    }

    async fn run(&self, args: &str) -> Result<String> {
        let fn_args: GetEmailArgs = args::parse(args)?;
        args::require("messageId", &fn_args.message_id)?;
        let message = self
            .google
            .gmail()
            .await?
            .get_full(fn_args.message_id.trim())
            .await?;
        let detail = EmailDetail::from(&message);
        let summary = &detail.summary;
        prompt::render(
            Prompt::EmailDetail,
            &json!({
                "id": summary.id,
                "thread_id": summary.thread_id,
                "subject": summary.subject,
                "from": summary.from,
                "to": summary.to,
                "date": summary.date,
                "labels": detail.labels.join(", "),
                "body": detail.body,
            }),
        )
    }
}

#[derive(Serialize)]
pub struct SendEmailProps {
    pub to: Property,
    pub subject: Property,
    pub body: Property,
    pub cc: Property,
    pub bcc: Property,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendEmailArgs {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub cc: Option<String>,
    pub bcc: Option<String>,
}

#[derive(Serialize)]
pub struct SendEmailTool {
    pub r#type: ToolType,
    pub function: Function<SendEmailProps>,
    #[serde(skip)]
    google: GoogleApi,
}

#[async_trait]
impl ToolCall for SendEmailTool {
    async fn call(&self, args: &str) -> Result<String, Error> {
        as_tool_text(self.function_name(), self.run(args).await)
    }

    fn function_name(&self) -> String {
        self.function.name.clone()
    }
}

impl SendEmailTool {
    pub fn new(google: GoogleApi) -> Self {
        let properties = SendEmailProps {
            to: Property::string("Recipient address. Separate multiple addresses with commas."),
            subject: Property::string("Subject line."),
            body: Property::string("Plain text body."),
            cc: Property::string("Addresses to copy, comma separated."),
            bcc: Property::string("Addresses to blind copy, comma separated."),
        };
        Self {
            r#type: ToolType::Function,
            function: Function::new(
                "send_email",
                "Send a plain text email from the user's Gmail account.",
                properties,
                &["to", "subject", "body"],
            ),
            google,
        }
    }

    /// Validate the arguments into a message ready to send.
    pub fn build(fn_args: SendEmailArgs) -> Result<OutgoingEmail> {
        args::emails("to", &fn_args.to)?;
        args::header("subject", &fn_args.subject)?;
        args::require("body", &fn_args.body)?;
        let cc = fn_args.cc.filter(|c| !c.trim().is_empty());
        let bcc = fn_args.bcc.filter(|b| !b.trim().is_empty());
        if let Some(cc) = &cc {
            args::emails("cc", cc)?;
        }
        if let Some(bcc) = &bcc {
            args::emails("bcc", bcc)?;
        }
        Ok(OutgoingEmail {
            to: fn_args.to.trim().to_string(),
            cc,
            bcc,
            subject: fn_args.subject,
            body: fn_args.body,
        })
    }

    async fn run(&self, args: &str) -> Result<String> {
        let email = Self::build(args::parse(args)?)?;
        let sent = self.google.gmail().await?.send(&email).await?;
        prompt::render(
            Prompt::SentEmail,
            &json!({
                "to": email.to,
                "subject": email.subject,
                "id": sent.id,
                "thread_id": sent.thread_id,
            }),
        )
    }
}
