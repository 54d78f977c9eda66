//! postwright-bot - console frontend for the Postwright drafting core
//!
//! Drives the full draft / media / schedule workflow from stdin against the
//! built-in mock generator, platform and transcoder, so the whole pipeline
//! can be exercised without any external service. A chat transport would
//! wire the same service calls to its own update loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{FixedOffset, Offset, Utc};
use clap::Parser;
use libpostwright::error::MediaError;
use libpostwright::generator::MockGenerator;
use libpostwright::logging::{LogFormat, LoggingConfig};
use libpostwright::platforms::mock::MockPlatform;
use libpostwright::schedule::parse_schedule;
use libpostwright::transcode::MockTranscoder;
use libpostwright::{
    Config, Event, IncomingMedia, Outcome, PostwrightError, PostwrightService, Result, UserId,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "postwright-bot")]
#[command(version)]
#[command(about = "Console frontend for the Postwright drafting core", long_about = "\
postwright-bot - console frontend for the Postwright drafting core

DESCRIPTION:
    Reads operator commands from stdin and drives the draft, media and
    scheduling workflow against built-in mocks. Scheduled entries fire in
    process; their outcomes are printed as they happen.

COMMANDS:
    <text>        rewrite the text into a draft (or caption staged media)
    /attach FILE  stage a media file for the next draft
    /edit         revise the draft with the next message
    /now          publish the draft immediately
    /in MINUTES   publish the draft after a delay
    /at TIME      publish the draft at a time (\"2h\", \"tomorrow 3pm\")
    /time         enter the publish time as the next message
    /queue        list pending entries
    /rm ID        remove a pending entry
    /cancel       discard the draft and staged media
    /quit         exit

CONFIGURATION:
    Configuration file: ~/.config/postwright/config.toml
    Override with POSTWRIGHT_CONFIG or --config.

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
    3 - Invalid input
")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Operator user id when no configuration file exists
    #[arg(long, default_value_t = 1)]
    user: u64,

    /// Log output format (text, json, pretty)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::new(cli.log_format, "info".to_string(), cli.verbose).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load().unwrap_or_else(|_| Config::default_config(cli.user)),
    };
    let operator = config.authorized_user();
    let offset = FixedOffset::east_opt(config.display.utc_offset_hours * 3600)
        .unwrap_or_else(|| Utc.fix());

    let service = Arc::new(PostwrightService::new(
        config,
        Arc::new(MockGenerator::success()),
        Arc::new(MockPlatform::success("console")),
        Arc::new(MockTranscoder::success()),
    ));

    info!(%operator, "postwright-bot starting");
    spawn_event_printer(service.subscribe(), offset);

    println!("postwright-bot ready (operator {}). Type /help for commands.", operator);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.map_err(MediaError::Io)? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                match handle_line(&service, operator, line, offset).await {
                    Ok(()) => {}
                    Err(e) => eprintln!("! {}", e),
                }
            }
        }
    }

    service.shutdown().await;
    info!("postwright-bot stopped");
    Ok(())
}

/// Print bus events as they arrive. Fire-time outcomes of scheduled
/// entries are only visible this way.
fn spawn_event_printer(mut rx: libpostwright::EventReceiver, offset: FixedOffset) {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event, offset),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });
}

fn print_event(event: &Event, offset: FixedOffset) {
    match event {
        Event::Published {
            platform_post_id,
            entry_id: Some(id),
            ..
        } => {
            println!("* scheduled entry {} published as {}", id, platform_post_id);
        }
        Event::PublishFailed {
            stage,
            error,
            entry_id: Some(id),
            ..
        } => {
            println!("* scheduled entry {} failed at {}: {}", id, stage, error);
        }
        Event::EntryScheduled {
            entry_id,
            publish_at,
            ..
        } => {
            println!(
                "* entry {} will publish at {}",
                entry_id,
                publish_at.with_timezone(&offset).format("%Y-%m-%d %H:%M")
            );
        }
        // Interactive outcomes are already printed by the command handler
        _ => {}
    }
}

async fn handle_line(
    service: &PostwrightService,
    operator: UserId,
    line: &str,
    offset: FixedOffset,
) -> Result<()> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };

    let outcome = match command {
        "/help" => {
            print_help(service);
            return Ok(());
        }
        "/attach" => {
            if rest.is_empty() {
                return Err(PostwrightError::InvalidInput(
                    "usage: /attach FILE".to_string(),
                ));
            }
            let incoming = read_attachment(Path::new(rest)).await?;
            service.handle_media(operator, &incoming).await?
        }
        "/edit" => service.request_edit(operator).await?,
        "/now" => service.publish_now(operator).await?,
        "/in" => {
            let minutes: u64 = rest.parse().map_err(|_| {
                PostwrightError::InvalidInput("usage: /in MINUTES".to_string())
            })?;
            service.schedule_in(operator, minutes).await?
        }
        "/at" => {
            let publish_at = parse_schedule(rest)?;
            service.schedule_at(operator, publish_at).await?
        }
        "/time" => service.begin_custom_schedule(operator).await?,
        "/queue" => {
            let items = service.queue(operator);
            if items.is_empty() {
                println!("queue is empty");
            }
            for item in items {
                println!(
                    "{}  {}  {}{}",
                    item.id,
                    item.publish_at.with_timezone(&offset).format("%Y-%m-%d %H:%M"),
                    item.preview,
                    if item.has_media { "  [media]" } else { "" }
                );
            }
            return Ok(());
        }
        "/rm" => {
            let id = Uuid::parse_str(rest).map_err(|_| {
                PostwrightError::InvalidInput("usage: /rm ENTRY-ID".to_string())
            })?;
            service.remove_queued(operator, id).await?;
            println!("entry {} removed", id);
            return Ok(());
        }
        "/cancel" => service.cancel_draft(operator).await?,
        cmd if cmd.starts_with('/') => {
            return Err(PostwrightError::InvalidInput(format!(
                "unknown command: {}",
                cmd
            )));
        }
        _ => service.handle_message(operator, line).await?,
    };

    print_outcome(&outcome, service, offset);
    Ok(())
}

fn print_outcome(outcome: &Outcome, service: &PostwrightService, offset: FixedOffset) {
    match outcome {
        Outcome::Ignored => {}
        Outcome::DraftReady { text } => {
            let delays = service
                .config()
                .schedule
                .quick_delays_minutes
                .iter()
                .map(|m| format!("/in {}", m))
                .collect::<Vec<_>>()
                .join(", ");
            println!("draft:\n  {}", text);
            println!("approve with /now, {}, /time, or refine with /edit", delays);
        }
        Outcome::CaptionRequested => {
            println!("media staged; send a caption to draft the post");
        }
        Outcome::EditPrompt { current } => {
            println!("current draft:\n  {}", current);
            println!("send the revision instruction");
        }
        Outcome::ScheduleTimePrompt => {
            println!("send the publish time (\"30m\", \"2h\", \"tomorrow 3pm\")");
        }
        Outcome::Published { post_id } => {
            println!("published as {}", post_id);
        }
        Outcome::Scheduled {
            entry_id,
            publish_at,
        } => {
            println!(
                "scheduled {} for {}",
                entry_id,
                publish_at.with_timezone(&offset).format("%Y-%m-%d %H:%M")
            );
        }
        Outcome::Cancelled => {
            println!("draft discarded");
        }
    }
}

fn print_help(service: &PostwrightService) {
    let delays = service
        .config()
        .schedule
        .quick_delays_minutes
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("/");
    println!("  <text>        rewrite the text into a draft (or caption staged media)");
    println!("  /attach FILE  stage a media file for the next draft");
    println!("  /edit         revise the draft with the next message");
    println!("  /now          publish the draft immediately");
    println!("  /in MINUTES   publish after a delay (quick picks: {})", delays);
    println!("  /at TIME      publish at a time (\"2h\", \"tomorrow 3pm\")");
    println!("  /time         enter the publish time as the next message");
    println!("  /queue        list pending entries");
    println!("  /rm ID        remove a pending entry");
    println!("  /cancel       discard the draft and staged media");
    println!("  /quit         exit");
}

/// Load a local file as an incoming attachment, guessing the mime type
/// from its extension the way a transport would declare it.
async fn read_attachment(path: &Path) -> Result<IncomingMedia> {
    let bytes = tokio::fs::read(path).await.map_err(MediaError::Io)?;
    let unique_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    let mime = match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mov") => "video/quicktime",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    };

    Ok(IncomingMedia {
        unique_id,
        mime: mime.to_string(),
        bytes,
    })
}
