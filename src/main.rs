//! paperbot - Slack paper-summary bot entry point
//!
//! Wires the RTM transport, the resolver, the translator and the
//! destination queue into one dispatcher, spawns the daily trending
//! announcement task and drains the event stream until the socket closes
//! or the credentials are rejected.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveTime};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paperbot::dispatch::{BotIdentity, Dispatcher, LoopAction};
use paperbot::paper::Resolver;
use paperbot::queue::DestinationQueue;
use paperbot::slack::{self, SlackClient};
use paperbot::translate::Translator;
use paperbot::trending::{self, TrendSource};

/// Command-line arguments for paperbot
#[derive(Parser, Debug)]
#[command(name = "paperbot")]
#[command(about = "Slack bot that summarizes academic paper links")]
#[command(version)]
struct Args {
    /// Slack API token
    #[arg(long, env = "PAPERBOT_SLACK_TOKEN", hide_env_values = true)]
    slack_token: String,

    /// Channel that receives the daily trending-paper announcement
    #[arg(long, env = "ARXIV_TREND_CHANNEL_ID")]
    trend_channel_id: String,

    /// The bot's own user id, used to detect mentions
    #[arg(long, env = "BOT_USER_ID")]
    bot_user_id: String,

    /// Display name for attachment posts
    #[arg(long, env = "BOT_USER_NAME", default_value = "paperbot")]
    bot_user_name: String,

    /// Icon URL for attachment posts
    #[arg(long, env = "BOT_ICON_URL", default_value = "")]
    bot_icon_url: String,

    /// Local time of day for the trending announcement, HH:MM
    #[arg(long, env = "TREND_AT", default_value = "12:00")]
    trend_at: String,

    /// Ranking page to scrape for trending papers
    #[arg(long, env = "TREND_PAGE_URL", default_value = trending::TREND_PAGE_URL)]
    trend_page_url: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paperbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let trend_time = NaiveTime::parse_from_str(&args.trend_at, "%H:%M")
        .context("TREND_AT must be HH:MM")?;

    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(25))
        .build()
        .context("Failed to build HTTP client")?;

    info!("Connecting to Slack RTM");
    let (sender, mut receiver) = slack::rtm_connect(&http, &args.slack_token)
        .await
        .context("Failed to open RTM session")?;

    let outbound = SlackClient::new(http.clone(), args.slack_token.clone(), sender);
    let dispatcher = Arc::new(Dispatcher::new(
        outbound,
        Resolver::new().context("Failed to build resolver")?,
        Translator::new().context("Failed to build translator")?,
        DestinationQueue::new(),
        BotIdentity {
            user_id: args.bot_user_id,
            username: args.bot_user_name,
            icon_url: args.bot_icon_url,
        },
    ));

    let trend_source =
        TrendSource::new(args.trend_page_url).context("Failed to build trend source")?;
    let trend_channel = args.trend_channel_id;
    let trend_dispatcher = dispatcher.clone();
    tokio::spawn(async move {
        loop {
            let wait = trending::until_next_occurrence(Local::now(), trend_time);
            info!(seconds = wait.as_secs(), "next trending announcement scheduled");
            tokio::time::sleep(wait).await;
            match trend_source.fetch_trending().await {
                Ok(entries) => {
                    info!(count = entries.len(), "announcing trending papers");
                    trend_dispatcher.announce_trending(&trend_channel, &entries).await;
                }
                Err(err) => warn!(%err, "trending scrape failed"),
            }
        }
    });

    info!("Entering event loop");
    while let Some(event) = receiver.next().await {
        if dispatcher.handle_event(event).await == LoopAction::Stop {
            break;
        }
    }

    info!("Event loop ended");
    Ok(())
}
