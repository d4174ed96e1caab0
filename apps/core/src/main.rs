// Buddy Core Entry Point
// Terminal front end over the support engine

use anyhow::Context;
use buddy_core::actors::messages::SessionId;
use buddy_core::actors::supervisor::SupervisorHandle;
use buddy_core::brain::{
    Category, CategoryCatalog, ClassificationCache, Orchestrator, QuickTopic, TurnReply,
};
use buddy_core::config::BuddyConfig;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Duration;
use tracing::{error, info};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "Commands: /help  /mood <1-5> <1-5>  /topic <name>  /trends  /snapshot  /reset  /quit";

/// Logs go to stderr. `BUDDY_LOG_FORMAT=json` switches to bunyan output.
fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let json = std::env::var("BUDDY_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(JsonStorageLayer)
            .with(BunyanFormattingLayer::new(
                "buddy-core".to_string(),
                std::io::stderr,
            ))
            .try_init()
            .context("Failed to init subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
            .context("Failed to init subscriber")?;
    }
    Ok(())
}

fn build_orchestrator(config: &BuddyConfig) -> anyhow::Result<Orchestrator> {
    let catalog = match &config.catalog_path {
        Some(path) => CategoryCatalog::from_path(path)
            .with_context(|| format!("Failed to load catalog from {:?}", path))?,
        None => CategoryCatalog::embedded(config.language)?,
    };
    info!(
        version = catalog.version(),
        language = catalog.language().code(),
        estimator = ?config.estimator,
        "Catalog loaded"
    );

    let cache = Arc::new(ClassificationCache::new(config.classification_cache_size));
    Ok(Orchestrator::new(
        Arc::new(catalog),
        config.estimator.build(),
        config.selector_settings(),
        config.session_limits(),
    )
    .with_cache(cache))
}

fn print_reply(reply: &TurnReply) {
    println!("\n{}\n", reply.full_text());
    if reply.session_crisis && !reply.crisis {
        println!("(If you are still in danger, type /help for emergency contacts.)\n");
    }
}

/// Handles a slash command. Returns `false` when the loop should stop.
async fn run_command(
    supervisor: &SupervisorHandle,
    session_id: SessionId,
    line: &str,
) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match command {
        "/quit" | "/exit" => return Ok(false),
        "/help" => println!("\n{}\n", supervisor.help_now(session_id).await?),
        "/reset" => println!("\n{}\n", supervisor.reset_session(session_id).await?),
        "/trends" => {
            let trends = supervisor.trends(session_id).await?;
            println!(
                "\nmood: {} ({:+.2})  stress: {} ({:+.2})\n",
                trends.mood_trend, trends.mood_delta, trends.stress_trend, trends.stress_delta
            );
        }
        "/snapshot" => {
            let snapshot = supervisor.snapshot(session_id).await?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        "/mood" => {
            let [mood, stress] = args.as_slice() else {
                println!("Usage: /mood <mood 1-5> <stress 1-5>");
                return Ok(true);
            };
            let mood: i32 = mood.parse().context("mood must be a number")?;
            let stress: i32 = stress.parse().context("stress must be a number")?;
            let entry = supervisor
                .record_mood(session_id, mood, stress, Category::GeneralSupport, false)
                .await?;
            println!("\nRecorded mood {} / stress {}\n", entry.mood(), entry.stress());
        }
        "/topic" => match args.first().map(|t| t.parse::<QuickTopic>()) {
            Some(Ok(topic)) => print_reply(&supervisor.quick_topic(session_id, topic).await?),
            _ => {
                let names: Vec<&str> = QuickTopic::ALL.iter().map(|t| t.id()).collect();
                println!("Topics: {}", names.join(", "));
            }
        },
        _ => println!("{}", USAGE),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    let config = BuddyConfig::from_env().context("Invalid configuration")?;
    let orchestrator = Arc::new(build_orchestrator(&config)?);
    let supervisor = SupervisorHandle::new(
        orchestrator,
        config.rng_seed,
        Duration::from_secs(config.turn_timeout_secs),
    );

    let (session_id, welcome) = supervisor.open_session().await?;
    println!("\n{}\n\n{}\n", welcome, USAGE);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = if line.starts_with('/') {
            run_command(&supervisor, session_id, line).await
        } else {
            match supervisor.process_message(session_id, line.to_string()).await {
                Ok(reply) => {
                    print_reply(&reply);
                    Ok(true)
                }
                Err(e) => Err(e.into()),
            }
        };

        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("Request failed: {:#}", e);
                println!("Something went wrong on my side. Please try again.");
            }
        }
    }

    supervisor.close_session(session_id).await?;
    supervisor.shutdown().await?;
    info!("Goodbye");
    Ok(())
}
