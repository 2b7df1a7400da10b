use std::time::Duration;

use anyhow::{Error, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::ErrandError;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Assistant,
    User,
    Tool,
}

// What a tool call request from the model looks like:
//
// {
//     "content": null,
//     "role": "assistant",
//     "tool_calls": [
//         {
//             "function": {
//                 "arguments": "{\"itemName\":\"bagel\"}",
//                 "name": "order_food_item"
//             },
//             "id": "call_KCg5V0N5E7hHHrUwdefHBfgL",
//             "type": "function"
//         }
//     ]
// }
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FunctionCallFn {
    pub arguments: String,
    pub name: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct FunctionCall {
    pub function: FunctionCallFn,
    pub id: String,
    pub r#type: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Message {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<FunctionCall>>,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: Some(content.to_string()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    /// The assistant turn asking for tools. Must precede the matching
    /// tool responses in the transcript.
    pub fn new_tool_call_request(tool_calls: Vec<FunctionCall>) -> Self {
        Self {
            tool_calls: Some(tool_calls),
            content: None,
            ..Self::new(Role::Assistant, "")
        }
    }

    pub fn new_tool_call_response(content: &str, tool_call_id: &str) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_string()),
            ..Self::new(Role::Tool, content)
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct PropertyItems {
    pub r#type: String,
}

#[derive(Serialize, Clone, Debug)]
pub struct Property {
    pub r#type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<PropertyItems>,
}

impl Property {
    fn of(kind: &str, description: &str) -> Self {
        Self {
            r#type: kind.to_string(),
            description: description.to_string(),
            items: None,
        }
    }

    pub fn string(description: &str) -> Self {
        Self::of("string", description)
    }

    pub fn integer(description: &str) -> Self {
        Self::of("integer", description)
    }

    pub fn string_array(description: &str) -> Self {
        Self {
            items: Some(PropertyItems {
                r#type: "string".to_string(),
            }),
            ..Self::of("array", description)
        }
    }
}

#[derive(Serialize)]
pub struct Parameters<Props: Serialize> {
    pub r#type: String,
    pub properties: Props,
    pub required: Vec<String>,
    #[serde(rename = "additionalProperties")]
    pub additional_properties: bool,
}

#[derive(Serialize)]
pub struct Function<Props: Serialize> {
    pub name: String,
    pub description: String,
    pub parameters: Parameters<Props>,
    pub strict: bool,
}

impl<Props: Serialize> Function<Props> {
    /// A function declaration with an object parameter schema. Optional
    /// parameters are allowed, so strict mode stays off.
    pub fn new(name: &str, description: &str, properties: Props, required: &[&str]) -> Self {
        Function {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Parameters {
                r#type: String::from("object"),
                properties,
                required: required.iter().map(|r| r.to_string()).collect(),
                additional_properties: false,
            },
            strict: false,
        }
    }
}

#[derive(Serialize)]
pub enum ToolType {
    #[serde(rename = "function")]
    Function,
}

// `serde::Serialize` is not object safe, so the tool trait objects go
// through `erased_serde` to serialize their schema into the request.
#[async_trait]
pub trait ToolCall: erased_serde::Serialize {
    async fn call(&self, args: &str) -> Result<String, Error>;
    fn function_name(&self) -> String;
}
erased_serde::serialize_trait_object!(ToolCall);

pub type BoxedToolCall = Box<dyn ToolCall + Send + Sync + 'static>;

// Tool-heavy turns can take a while on larger models
const COMPLETION_TIMEOUT: Duration = Duration::from_secs(120);

/// One request to an OpenAI compatible `/v1/chat/completions` endpoint.
/// Returns the raw response body.
pub async fn completion(
    messages: &Vec<Message>,
    tools: &Option<Vec<BoxedToolCall>>,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<Value, Error> {
    let mut payload = json!({
        "model": model,
        "messages": messages,
    });
    if let Some(tools) = tools.as_ref().filter(|t| !t.is_empty()) {
        payload["tools"] = json!(tools);
    }
    let url = format!("{}/v1/chat/completions", api_hostname.trim_end_matches('/'));
    tracing::debug!("Requesting completion from {} with {} message(s)", url, messages.len());

    let response = reqwest::Client::new()
        .post(url)
        .bearer_auth(api_key)
        .timeout(COMPLETION_TIMEOUT)
        .json(&payload)
        .send()
        .await
        .map_err(|e| ErrandError::upstream(format!("LLM request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!(ErrandError::upstream(format!(
            "Chat completion failed: {} ({})",
            status, text
        )));
    }

    Ok(response.json().await?)
}
