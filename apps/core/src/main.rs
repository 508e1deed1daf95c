// MarketPulse terminal front end
// Reads questions from stdin and prints the assistant's answers as they arrive.

use anyhow::Context;
use async_trait::async_trait;
use marketpulse_core::models::{Message, Sender};
use marketpulse_core::telemetry;
use marketpulse_core::{AppError, AssistantConfig, EventSink, SessionEvent, SessionHandle};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Prints session events to stdout.
struct ConsoleSink;

impl ConsoleSink {
    fn render(message: &Message) -> String {
        let mut out = match (message.sender, message.kind) {
            (Sender::User, _) => format!("you> {}", message.text),
            (Sender::Bot, Some(kind)) => format!("bot [{}]> {}", kind, message.text),
            (Sender::Bot, None) => format!("bot> {}", message.text),
        };
        if let Some(hashtags) = message.hashtags.as_ref().filter(|h| !h.is_empty()) {
            out.push_str(&format!("\n     {}", hashtags.join(" ")));
        }
        for link in message.links.iter().flatten() {
            out.push_str(&format!("\n     - {} <{}>", link.title, link.url));
        }
        out
    }
}

#[async_trait]
impl EventSink for ConsoleSink {
    async fn emit(&self, event: SessionEvent) -> Result<(), AppError> {
        let mut stdout = std::io::stdout().lock();
        match event {
            SessionEvent::MessageAppended(message) => {
                writeln!(stdout, "{}", Self::render(&message))?;
            }
            SessionEvent::TypingChanged(true) => writeln!(stdout, "bot is typing...")?,
            SessionEvent::TypingChanged(false) => {}
            SessionEvent::SubmissionQueued { position } => {
                writeln!(stdout, "(queued, {} ahead of you)", position)?;
            }
            SessionEvent::SubmissionRejected { .. } => {
                writeln!(stdout, "(still answering, please wait)")?;
            }
            SessionEvent::JobCancelled(_) | SessionEvent::Closed => {}
        }
        stdout.flush()?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = AssistantConfig::from_env().context("Failed to load configuration")?;
    telemetry::init(config.log_format)?;
    info!(policy = ?config.overlap_policy, "Starting MarketPulse assistant");

    let session = SessionHandle::from_config(&config, Arc::new(ConsoleSink))
        .context("Failed to start session")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match session.submit(line).await {
            Ok(_) => {}
            // already reported through the sink
            Err(AppError::SessionBusy) => {}
            Err(e) => {
                warn!("Submission failed: {}", e);
                break;
            }
        }
    }

    session.wait_idle().await?;
    session.shutdown().await?;
    info!("Goodbye");
    Ok(())
}
