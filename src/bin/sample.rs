//! Command-line sample for the DeepSeek client
//!
//! ```text
//! deepseek-sample models
//! deepseek-sample balance
//! deepseek-sample chat <prompt>
//! deepseek-sample stream <prompt>
//! deepseek-sample complete <prompt>
//! ```
//!
//! Reads `DEEPSEEK_API_KEY` from the environment or a `.env` file. Ctrl-C
//! stops a running request or stream.

use anyhow::{bail, Context, Result};
use deepseek::{
    ChatRequest, ChoiceStream, CompletionRequest, ConfigLoader, DeepSeekClient, Message, Model,
    StreamAccumulator, StreamUsage,
};
use futures::StreamExt;
use std::io::Write;
use tokio_util::sync::CancellationToken;

const USAGE: &str = "usage: deepseek-sample <models|balance|chat|stream|complete> [prompt]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().context(USAGE)?;
    let prompt = args.collect::<Vec<_>>().join(" ");

    let config = ConfigLoader::new()
        .context("Failed to load configuration")?
        .into_config();
    let client = DeepSeekClient::from_config(&config).context("Failed to create client")?;

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    match command.as_str() {
        "models" => {
            let models = client.list_models(&cancel).await?;
            for model in &models.data {
                println!("{}", model_line(model));
            }
        }
        "balance" => {
            let user = client.user_balance(&cancel).await?;
            println!("available: {}", user.is_available);
            for info in user.balance_infos {
                println!(
                    "{}\ttotal {}\tgranted {}\ttopped up {}",
                    info.currency, info.total_balance, info.granted_balance, info.topped_up_balance
                );
            }
        }
        "chat" => {
            let request = chat_request(&prompt)?;
            let response = client.chat(&request, &cancel).await?;
            println!("{}", response.content().unwrap_or_default());
            if let Some(usage) = response.usage {
                eprintln!(
                    "tokens: prompt {} completion {} total {}",
                    usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
                );
            }
        }
        "stream" => {
            let request = chat_request(&prompt)?.with_usage_in_stream();
            let (choices, usage) = client.chat_stream_with_usage(&request, &cancel).await?;
            print_stream(choices, &usage).await?;
        }
        "complete" => {
            if prompt.is_empty() {
                bail!("complete needs a prompt");
            }
            let request = CompletionRequest::new(prompt).with_max_tokens(256);
            let (choices, usage) = client
                .completions_stream_with_usage(&request, &cancel)
                .await?;
            print_stream(choices, &usage).await?;
        }
        other => bail!("unknown command {other:?}\n{USAGE}"),
    }

    Ok(())
}

fn model_line(model: &Model) -> String {
    format!("{}\t{}", model.id, model.owned_by.as_deref().unwrap_or("-"))
}

fn chat_request(prompt: &str) -> Result<ChatRequest> {
    if prompt.is_empty() {
        bail!("chat needs a prompt");
    }
    Ok(ChatRequest::new(vec![
        Message::system("You are a helpful assistant."),
        Message::user(prompt),
    ]))
}

async fn print_stream(mut choices: ChoiceStream, usage: &StreamUsage) -> Result<()> {
    let mut accumulator = StreamAccumulator::new();
    let mut stdout = std::io::stdout();

    while let Some(choice) = choices.next().await {
        let choice = choice?;
        if let Some(text) = choice.content() {
            write!(stdout, "{text}")?;
            stdout.flush()?;
        }
        accumulator.push(&choice);
    }
    writeln!(stdout)?;
    accumulator.usage = usage.get();

    if let Some(reason) = &accumulator.finish_reason {
        eprintln!("finish reason: {reason:?}");
    }
    if let Some(usage) = &accumulator.usage {
        eprintln!(
            "tokens: prompt {} completion {} total {}",
            usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
        );
    }
    Ok(())
}
