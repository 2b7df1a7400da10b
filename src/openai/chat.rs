use anyhow::{Error, Result, anyhow, bail};
use serde_json::Value;

use crate::core::error::tool_error_text;
use crate::openai::{BoxedToolCall, FunctionCall, FunctionCallFn, Message, Role, completion};

// A model that keeps asking for tools without ever answering is cut
// off after this many rounds.
const MAX_TOOL_ROUNDS: usize = 8;

/// Parse one tool call from the completion response into the request
/// that gets echoed back into the transcript.
fn parse_tool_call(tool_call: &Value) -> Result<FunctionCall, Error> {
    let id = tool_call["id"]
        .as_str()
        .ok_or(anyhow!("Tool call missing ID: {}", tool_call))?;
    let function = &tool_call["function"];
    let arguments = function["arguments"]
        .as_str()
        .ok_or(anyhow!("Tool call missing arguments: {}", tool_call))?;
    let name = function["name"]
        .as_str()
        .ok_or(anyhow!("Tool call missing name: {}", tool_call))?;

    Ok(FunctionCall {
        function: FunctionCallFn {
            arguments: arguments.to_string(),
            name: name.to_string(),
        },
        id: id.to_string(),
        r#type: String::from("function"),
    })
}

/// Route a tool call by name. Failures, including an unknown tool
/// name, come back as text so the model can see them and retry.
async fn dispatch_tool_call(tools: &[BoxedToolCall], call: &FunctionCall) -> String {
    let FunctionCallFn { name, arguments } = &call.function;
    tracing::debug!("\nTool call: {}\nargs: {}", name, arguments);

    let Some(tool) = tools.iter().find(|t| t.function_name() == *name) else {
        tracing::warn!("Received tool call that doesn't exist: {}", name);
        return format!("Error: Unknown tool '{}'", name);
    };

    match tool.call(arguments).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!("Tool {} failed: {:#}", name, err);
            tool_error_text(&err)
        }
    }
}

/// Run every requested tool call in the order the model asked for
/// them. Calls are awaited one at a time so side effects (sending two
/// emails, ordering two items) happen in request order.
async fn handle_tool_calls(
    tools: &[BoxedToolCall],
    tool_calls: &[Value],
) -> Result<Vec<Message>, Error> {
    let calls = tool_calls
        .iter()
        .map(parse_tool_call)
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = vec![Message::new_tool_call_request(calls.clone())];
    for call in calls.iter() {
        let output = dispatch_tool_call(tools, call).await;
        results.push(Message::new_tool_call_response(&output, &call.id));
    }

    Ok(results)
}

/// Runs the next turn in chat by passing a transcript to the LLM for
/// the next response. Can return multiple messages when there are
/// tool calls; the last one is always the assistant's reply.
pub async fn chat(
    tools: &Option<Vec<BoxedToolCall>>,
    history: &Vec<Message>,
    api_hostname: &str,
    api_key: &str,
    model: &str,
) -> Result<Vec<Message>, Error> {
    let mut updated_history = history.to_owned();
    let mut messages = Vec::new();

    let mut resp = completion(history, tools, api_hostname, api_key, model).await?;
    let mut rounds = 0;

    // Tool calls need to be handled for the chat to proceed
    while let Some(tool_calls) = resp["choices"][0]["message"]["tool_calls"].as_array() {
        if tool_calls.is_empty() {
            break;
        }
        if rounds == MAX_TOOL_ROUNDS {
            bail!("Model requested tools {} times without replying", MAX_TOOL_ROUNDS);
        }
        rounds += 1;

        let tools_ref = tools
            .as_ref()
            .ok_or(anyhow!("Received tool call but no tools were specified"))?;
        let tool_call_msgs = handle_tool_calls(tools_ref, tool_calls).await?;
        for m in tool_call_msgs.into_iter() {
            messages.push(m.clone());
            updated_history.push(m);
        }

        // Provide the results of the tool calls back to the chat
        resp = completion(&updated_history, tools, api_hostname, api_key, model).await?;
    }

    if let Some(msg) = resp["choices"][0]["message"]["content"].as_str() {
        messages.push(Message::new(Role::Assistant, msg));
    } else {
        bail!("No message received. Resp:\n\n {}", resp);
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrandError;
    use crate::openai::ToolCall;
    use async_trait::async_trait;
    use serde::Serialize;
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    #[derive(Serialize)]
    struct RecordingTool {
        #[serde(skip)]
        name: String,
        #[serde(skip)]
        log: Arc<Mutex<Vec<(String, Instant)>>>,
    }

    #[async_trait]
    impl ToolCall for RecordingTool {
        async fn call(&self, args: &str) -> Result<String, Error> {
            // Yield so an accidental concurrent dispatch would interleave
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.log.lock().unwrap().push((args.to_string(), Instant::now()));
            Ok(format!("sent {}", args))
        }
        fn function_name(&self) -> String {
            self.name.clone()
        }
    }

    #[derive(Serialize)]
    struct FailingTool;

    #[async_trait]
    impl ToolCall for FailingTool {
        async fn call(&self, _args: &str) -> Result<String, Error> {
            Err(ErrandError::upstream("Calendar returned 503").into())
        }
        fn function_name(&self) -> String {
            "list_calendars".to_string()
        }
    }

    fn tool_call_response(calls: &[(&str, &str, &str)]) -> String {
        let tool_calls: Vec<Value> = calls
            .iter()
            .map(|(id, name, args)| {
                serde_json::json!({
                    "id": id,
                    "type": "function",
                    "function": {"name": name, "arguments": args}
                })
            })
            .collect();
        serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "tool_calls": tool_calls}}]
        })
        .to_string()
    }

    const FINAL_RESPONSE: &str =
        r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"All done."}}]}"#;

    #[tokio::test]
    async fn it_runs_tool_calls_sequentially_in_requested_order() {
        let mut server = mockito::Server::new_async().await;
        // The follow-up request carries tool results, the first one doesn't
        let _final = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("tool_call_id".to_string()))
            .with_status(200)
            .with_body(FINAL_RESPONSE)
            .create_async()
            .await;
        let _first = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(tool_call_response(&[
                ("call_1", "send_email", r#"{"n":1}"#),
                ("call_2", "send_email", r#"{"n":2}"#),
                ("call_3", "send_email", r#"{"n":3}"#),
            ]))
            .create_async()
            .await;

        let log = Arc::new(Mutex::new(Vec::new()));
        let tools: Option<Vec<BoxedToolCall>> = Some(vec![Box::new(RecordingTool {
            name: "send_email".to_string(),
            log: log.clone(),
        })]);
        let history = vec![Message::new(Role::User, "send three emails")];

        let messages = chat(&tools, &history, &server.url(), "key", "gpt-4")
            .await
            .unwrap();

        let log = log.lock().unwrap();
        let order: Vec<&str> = log.iter().map(|(args, _)| args.as_str()).collect();
        assert_eq!(order, vec![r#"{"n":1}"#, r#"{"n":2}"#, r#"{"n":3}"#]);
        assert!(log.windows(2).all(|w| w[0].1 <= w[1].1));

        // One request message, three results, one reply
        assert_eq!(messages.len(), 5);
        assert_eq!(messages.last().unwrap().content.as_deref(), Some("All done."));
    }

    #[tokio::test]
    async fn it_returns_tool_errors_to_the_model_as_text() {
        let mut server = mockito::Server::new_async().await;
        let _final = server
            .mock("POST", "/v1/chat/completions")
            .match_body(mockito::Matcher::Regex("tool_call_id".to_string()))
            .with_status(200)
            .with_body(FINAL_RESPONSE)
            .create_async()
            .await;
        let _first = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(tool_call_response(&[
                ("call_1", "list_calendars", "{}"),
                ("call_2", "does_not_exist", "{}"),
            ]))
            .create_async()
            .await;

        let tools: Option<Vec<BoxedToolCall>> = Some(vec![Box::new(FailingTool)]);
        let history = vec![Message::new(Role::User, "what calendars do I have?")];
        let messages = chat(&tools, &history, &server.url(), "key", "gpt-4")
            .await
            .unwrap();

        assert_eq!(
            messages[1].content.as_deref(),
            Some("Error: Upstream service error: Calendar returned 503")
        );
        assert_eq!(
            messages[2].content.as_deref(),
            Some("Error: Unknown tool 'does_not_exist'")
        );
        assert_eq!(messages.last().unwrap().role, Role::Assistant);
    }

    #[tokio::test]
    async fn it_returns_direct_replies_without_tools() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(FINAL_RESPONSE)
            .create_async()
            .await;

        let history = vec![Message::new(Role::User, "hello")];
        let messages = chat(&None, &history, &server.url(), "key", "gpt-4")
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content.as_deref(), Some("All done."));
    }
}
