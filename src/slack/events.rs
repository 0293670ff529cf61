//! RTM socket frames decoded into typed events
//!
//! Two frame families matter: typed events (`"type": "message"` and
//! friends) and reply acknowledgments, which carry `ok`/`reply_to` instead
//! of a type and echo back the text of a message this process sent.

use serde_json::Value;
use tracing::debug;

/// Inbound transport events the dispatcher consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// RTM hello, session established
    Connected,
    /// A user posted a message
    Message(MessageEvent),
    /// Acknowledgment of a message this process sent earlier
    Ack(AckEvent),
    /// Presence change, observed only
    PresenceChange { user: String },
    /// Pong for a keepalive ping, observed only
    Pong,
    /// Non-fatal transport error
    TransportError { code: i64, msg: String },
    /// Credentials rejected, terminal
    InvalidAuth,
    /// Anything this bot does not act on
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageEvent {
    pub channel: String,
    pub user: String,
    pub text: String,
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AckEvent {
    pub ok: bool,
    pub reply_to: u64,
    /// Original text of the acknowledged outgoing message
    pub text: String,
    /// Timestamp assigned to the delivered message, used as thread anchor
    pub ts: String,
}

/// Decode one raw socket frame. Malformed frames become [`Event::Other`].
pub fn decode(raw: &str) -> Event {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            debug!(%err, "undecodable RTM frame");
            return Event::Other("malformed".to_string());
        }
    };

    if value.get("type").is_none() {
        // Reply acks have no type field
        if let (Some(ok), Some(reply_to)) = (
            value.get("ok").and_then(Value::as_bool),
            value.get("reply_to").and_then(Value::as_u64),
        ) {
            return Event::Ack(AckEvent {
                ok,
                reply_to,
                text: str_field(&value, "text"),
                ts: str_field(&value, "ts"),
            });
        }
        return Event::Other("untyped".to_string());
    }

    match value["type"].as_str().unwrap_or_default() {
        "hello" => Event::Connected,
        "message" => {
            if let Some(subtype) = value.get("subtype").and_then(Value::as_str) {
                // Edits, joins, bot posts and other subtypes are not summarized
                return Event::Other(format!("message:{subtype}"));
            }
            Event::Message(MessageEvent {
                channel: str_field(&value, "channel"),
                user: str_field(&value, "user"),
                text: str_field(&value, "text"),
                ts: str_field(&value, "ts"),
            })
        }
        "presence_change" => Event::PresenceChange { user: str_field(&value, "user") },
        "pong" => Event::Pong,
        "error" => {
            let code = value["error"]["code"].as_i64().unwrap_or(0);
            let msg = value["error"]["msg"].as_str().unwrap_or_default().to_string();
            if msg.contains("auth") {
                Event::InvalidAuth
            } else {
                Event::TransportError { code, msg }
            }
        }
        other => Event::Other(other.to_string()),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}
