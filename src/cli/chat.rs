use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Local;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::ai::tools;
use crate::core::AppConfig;
use crate::google::GoogleApi;
use crate::google::oauth::GoogleAuth;
use crate::openai::chat;
use crate::openai::{Message, Role};
use crate::ordering::OrderingDriver;

fn system_message(config: &AppConfig) -> String {
    format!(
        "{}\n\nToday is {}. Unless the user says otherwise, times are in {}.",
        config.system_message,
        Local::now().format("%A, %Y-%m-%d %H:%M"),
        config.default_timezone
    )
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| anyhow!("OPENAI_API_KEY must be set to chat"))?;
    let mut rl = DefaultEditor::new()?;

    let google = GoogleApi::new(GoogleAuth::from_config(config));
    let driver = Arc::new(OrderingDriver::from_config(config));
    let tools = Some(tools::registry(
        google,
        driver.clone(),
        &config.default_timezone,
    ));

    let mut history = vec![Message::new(Role::System, &system_message(config))];

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() || line == "exit" {
                    break;
                }
                let _ = rl.add_history_entry(line);
                history.push(Message::new(Role::User, line));

                match chat(
                    &tools,
                    &history,
                    &config.openai_api_hostname,
                    &api_key,
                    &config.openai_model,
                )
                .await
                {
                    Ok(messages) => {
                        let reply = messages
                            .last()
                            .and_then(|m| m.content.clone())
                            .unwrap_or_default();
                        println!("{}", reply);
                        history.extend(messages);
                    }
                    Err(err) => {
                        // Drop the unanswered message so the next turn
                        // starts from a consistent transcript
                        history.pop();
                        println!("Error: {:#}", err);
                    }
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    driver.shutdown().await;
    Ok(())
}
