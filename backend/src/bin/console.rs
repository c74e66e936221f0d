use std::{error::Error, sync::Arc};

use clap::Parser;
use runfinder::{
    config::Settings,
    messages::{CITY_PREFIX, SURFACE_PREFIX},
    models::{ChatEvent, Choice, InboundEvent, OutboundMessage},
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Interactive route search dialogue on stdin/stdout"
)]
struct Args {
    /// Identifier used for the session of this console
    #[arg(long, default_value_t = 1)]
    user_id: i64,

    #[command(flatten)]
    settings: Settings,
}

/// `/cmd` is a command, `city:`/`surface:` data or a label from the last
/// prompt is a choice, anything else is free text.
fn to_event(line: &str, offered: &[Choice]) -> ChatEvent {
    let line = line.trim();
    if let Some(command) = line.strip_prefix('/') {
        let name = command.split_whitespace().next().unwrap_or_default();
        return ChatEvent::Command(name.to_string());
    }
    if line.starts_with(CITY_PREFIX) || line.starts_with(SURFACE_PREFIX) {
        return ChatEvent::Choice(line.to_string());
    }
    match offered
        .iter()
        .find(|choice| choice.label.to_lowercase() == line.to_lowercase())
    {
        Some(choice) => ChatEvent::Choice(choice.data.clone()),
        None => ChatEvent::Text(line.to_string()),
    }
}

fn render(message: &OutboundMessage) -> String {
    let mut out = message.text.clone();
    for choice in &message.choices {
        out.push_str(&format!("\n  [{}]", choice.label));
    }
    out.push_str("\n\n");
    out
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "runfinder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let discovery = Arc::new(args.settings.discovery()?);
    let conversation = args.settings.conversation(discovery);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut offered: Vec<Choice> = Vec::new();

    let greeting = conversation
        .handle(InboundEvent {
            user_id: args.user_id,
            event: ChatEvent::Command("start".into()),
        })
        .await;
    stdout.write_all(render(&greeting).as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let event = to_event(&line, &offered);
        tracing::debug!("console event: {event:?}");
        let reply = conversation
            .handle(InboundEvent {
                user_id: args.user_id,
                event,
            })
            .await;
        offered = reply.choices.clone();
        stdout.write_all(render(&reply).as_bytes()).await?;
        stdout.flush().await?;
    }
    Ok(())
}
