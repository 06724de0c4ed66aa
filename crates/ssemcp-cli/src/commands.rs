//! Command handlers

use crate::args::{Cli, Commands};
use anyhow::{Context, anyhow};
use ssemcp_core::{McpTool, RpcOutcome, SseClient};
use std::future::Future;
use std::process::ExitCode;
use std::time::Duration;

const DESCRIPTION_WIDTH: usize = 60;

pub async fn run(client: &SseClient, cli: &Cli) -> anyhow::Result<ExitCode> {
    let limit = Duration::from_secs(cli.timeout);

    match &cli.command {
        Commands::Tools => {
            let tools = with_timeout(limit, "tools/list", client.list_tools()).await?;
            println!("{} tools available", tools.len());
            for tool in &tools {
                println!("{}", tool_line(tool));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Call { name, args } => {
            let arguments: serde_json::Value = serde_json::from_str(args)
                .with_context(|| format!("--args is not valid JSON: {}", args))?;
            let outcome = with_timeout(limit, name, client.call_tool(name, arguments)).await?;
            Ok(print_outcome(&outcome))
        }
        Commands::Ping => {
            let outcome = with_timeout(limit, "ping", client.ping()).await?;
            Ok(print_outcome(&outcome))
        }
    }
}

async fn with_timeout<T>(
    limit: Duration,
    operation: &str,
    future: impl Future<Output = ssemcp_core::McpResult<T>>,
) -> anyhow::Result<T> {
    let result = tokio::time::timeout(limit, future)
        .await
        .map_err(|_| anyhow!("{} timed out after {}s", operation, limit.as_secs()))?;
    result.with_context(|| format!("{} failed", operation))
}

fn print_outcome(outcome: &RpcOutcome) -> ExitCode {
    match outcome {
        RpcOutcome::Error(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
        RpcOutcome::Text(text) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        RpcOutcome::Value(value) => {
            match serde_json::to_string_pretty(value) {
                Ok(pretty) => println!("{}", pretty),
                Err(_) => println!("{}", value),
            }
            ExitCode::SUCCESS
        }
    }
}

fn tool_line(tool: &McpTool) -> String {
    let description = tool.description.as_deref().unwrap_or_default();
    format!("{}: {}", tool.name, truncate(description, DESCRIPTION_WIDTH))
}

/// Cut `text` to at most `max` characters
fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
