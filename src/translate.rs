//! Machine translation via the public Google web-translate endpoint
//!
//! The reply is the `dj=1` JSON shape: a list of translated sentence
//! fragments that are concatenated into the final text. Treated as a
//! single opaque remote call, no retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    sentences: Vec<Sentence>,
}

#[derive(Debug, Deserialize)]
struct Sentence {
    #[serde(default)]
    trans: String,
}

/// Translation capability the dispatcher calls through.
///
/// Production is [`Translator`]; tests substitute a canned backend.
#[async_trait]
pub trait Translate: Send + Sync {
    /// Translate `text` from `from` (a language code or `"auto"`) into `to`.
    async fn translate(&self, from: &str, to: &str, text: &str) -> Result<String>;
}

/// Client for the translation collaborator.
pub struct Translator {
    client: reqwest::Client,
}

impl Translator {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Translate for Translator {
    async fn translate(&self, from: &str, to: &str, text: &str) -> Result<String> {
        let response = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("dt", "t"),
                ("dj", "1"),
                ("ie", "UTF-8"),
                ("sl", from),
                ("tl", to),
                ("q", text),
            ])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Translate(format!("endpoint returned status {status}")));
        }
        let body = response.text().await?;
        parse_reply(&body)
    }
}

fn parse_reply(body: &str) -> Result<String> {
    let reply: Reply =
        serde_json::from_str(body).map_err(|err| Error::Translate(err.to_string()))?;
    Ok(reply.sentences.into_iter().map(|sentence| sentence.trans).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenates_sentence_fragments() {
        let body = r#"{
            "sentences": [
                {"trans": "This is a pen. ", "orig": "これはペンです。", "backend": 1},
                {"trans": "That is a book.", "orig": "あれは本です。", "backend": 1}
            ],
            "src": "ja"
        }"#;
        assert_eq!(parse_reply(body).unwrap(), "This is a pen. That is a book.");
    }

    #[test]
    fn empty_sentence_list_yields_empty_text() {
        assert_eq!(parse_reply(r#"{"src": "en"}"#).unwrap(), "");
        assert_eq!(parse_reply(r#"{"sentences": []}"#).unwrap(), "");
    }

    #[test]
    fn malformed_reply_is_an_error() {
        assert!(parse_reply("<html>not json</html>").is_err());
    }
}
