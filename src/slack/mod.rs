//! Slack transport: RTM socket for the event stream and plain sends,
//! Web API for attachment posts
//!
//! `rtm.connect` negotiates a websocket URL; the socket is split into a
//! cloneable sender (shared by the event loop and the trend job) and a
//! receiver the main loop drains. Plain messages go out as RTM frames and
//! come back as reply acks; rich attachments go through `chat.postMessage`.

pub mod events;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::warn;

use crate::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct RtmConnectResponse {
    ok: bool,
    url: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Open an RTM session: negotiate the socket URL, connect, split.
///
/// A rejected token surfaces here as [`Error::Slack`] with the API's
/// `invalid_auth` message, before any socket is opened.
pub async fn rtm_connect(http: &reqwest::Client, token: &str) -> Result<(RtmSender, RtmReceiver)> {
    let response = http
        .get("https://slack.com/api/rtm.connect")
        .bearer_auth(token)
        .send()
        .await?;
    let payload: RtmConnectResponse = response
        .json()
        .await
        .map_err(|err| Error::Slack(format!("rtm.connect reply: {err}")))?;
    if !payload.ok {
        return Err(Error::Slack(
            payload.error.unwrap_or_else(|| "rtm.connect failed".to_string()),
        ));
    }
    let url = payload
        .url
        .ok_or_else(|| Error::Slack("rtm.connect returned no socket URL".to_string()))?;

    let (stream, _) = connect_async(&url).await?;
    let (write, read) = stream.split();

    let sender = RtmSender {
        write: Arc::new(Mutex::new(write)),
        next_id: Arc::new(AtomicU64::new(1)),
    };
    Ok((sender, RtmReceiver { read }))
}

/// Cloneable handle for sending plain messages over the RTM socket.
#[derive(Clone)]
pub struct RtmSender {
    write: Arc<Mutex<SplitSink<WsStream, WsMessage>>>,
    next_id: Arc<AtomicU64>,
}

impl RtmSender {
    /// Send a plain text message. The returned id comes back in the
    /// reply ack's `reply_to`.
    pub async fn send_text(&self, channel: &str, text: &str) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = serde_json::json!({
            "id": id,
            "type": "message",
            "channel": channel,
            "text": text,
        });
        self.write
            .lock()
            .await
            .send(WsMessage::Text(frame.to_string()))
            .await?;
        Ok(id)
    }
}

/// Read half of the RTM socket, yielding decoded events.
pub struct RtmReceiver {
    read: SplitStream<WsStream>,
}

impl RtmReceiver {
    /// Next decoded event; `None` once the socket closes.
    pub async fn next(&mut self) -> Option<events::Event> {
        while let Some(frame) = self.read.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => return Some(events::decode(&text)),
                Ok(WsMessage::Close(_)) => return None,
                Ok(_) => continue,
                Err(err) => {
                    warn!(%err, "RTM socket read error");
                    return None;
                }
            }
        }
        None
    }
}

/// Attachment payload for `chat.postMessage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub author_name: String,
    pub title: String,
    pub title_link: String,
    pub text: String,
    pub fields: Vec<AttachmentField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

/// A threaded attachment post together with the bot's display identity.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentMessage {
    pub attachment: Attachment,
    /// Timestamp of the message this post is threaded under
    pub thread_ts: String,
    pub username: String,
    pub icon_url: String,
}

/// Outbound posting capability the dispatcher talks to.
#[async_trait]
pub trait Outbound: Send + Sync {
    /// Fire a plain one-line text message at a channel.
    async fn send_text(&self, channel: &str, text: &str) -> Result<()>;

    /// Post a rich attachment, threaded under `message.thread_ts`.
    async fn post_attachment(&self, channel: &str, message: &AttachmentMessage) -> Result<()>;
}

/// Production [`Outbound`]: RTM frames for plain sends, Web API for
/// attachments.
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    rtm: RtmSender,
}

impl SlackClient {
    pub fn new(http: reqwest::Client, token: impl Into<String>, rtm: RtmSender) -> Self {
        Self { http, token: token.into(), rtm }
    }
}

#[async_trait]
impl Outbound for SlackClient {
    async fn send_text(&self, channel: &str, text: &str) -> Result<()> {
        self.rtm.send_text(channel, text).await.map(|_| ())
    }

    async fn post_attachment(&self, channel: &str, message: &AttachmentMessage) -> Result<()> {
        let body = serde_json::json!({
            "channel": channel,
            "attachments": [&message.attachment],
            "thread_ts": &message.thread_ts,
            "username": &message.username,
            "icon_url": &message.icon_url,
        });
        let response = self
            .http
            .post("https://slack.com/api/chat.postMessage")
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let payload: ApiResponse = response
            .json()
            .await
            .map_err(|err| Error::Slack(format!("chat.postMessage reply: {err}")))?;
        if !payload.ok {
            return Err(Error::Slack(
                payload.error.unwrap_or_else(|| "chat.postMessage failed".to_string()),
            ));
        }
        Ok(())
    }
}
