//! Event dispatch: URL extraction, resolution and ordered delivery
//!
//! One [`Dispatcher`] instance serves both the main event loop and the
//! trend job. Per plain message it resolves every extractable URL, sends a
//! one-line summary per success and pushes the channel onto the destination
//! queue; per reply ack it re-resolves the acked text and delivers rich
//! attachments to destinations popped in FIFO order. Per-item failures are
//! logged and skipped, never aborting siblings or the loop.

use tracing::{debug, error, info, warn};

use crate::paper::{Paper, Resolver};
use crate::queue::DestinationQueue;
use crate::slack::events::{AckEvent, Event, MessageEvent};
use crate::slack::{Attachment, AttachmentField, AttachmentMessage, Outbound};
use crate::translate::Translate;
use crate::trending::TrendingPaper;
use crate::urls;
use crate::Error;

/// Display identity used for attachment posts and mention detection.
#[derive(Debug, Clone, Default)]
pub struct BotIdentity {
    pub user_id: String,
    pub username: String,
    pub icon_url: String,
}

/// Whether the main event loop keeps running after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Consumes transport events and coordinates output.
pub struct Dispatcher<O: Outbound> {
    outbound: O,
    resolver: Resolver,
    translator: Box<dyn Translate>,
    queue: DestinationQueue,
    bot: BotIdentity,
}

impl<O: Outbound> Dispatcher<O> {
    pub fn new(
        outbound: O,
        resolver: Resolver,
        translator: impl Translate + 'static,
        queue: DestinationQueue,
        bot: BotIdentity,
    ) -> Self {
        Self { outbound, resolver, translator: Box::new(translator), queue, bot }
    }

    /// Process one transport event.
    pub async fn handle_event(&self, event: Event) -> LoopAction {
        match event {
            Event::Connected => info!("RTM session established"),
            Event::Message(message) => self.handle_message(message).await,
            Event::Ack(ack) => self.handle_ack(ack).await,
            Event::PresenceChange { user } => debug!(%user, "presence change"),
            Event::Pong => debug!("pong"),
            Event::TransportError { code, msg } => warn!(code, %msg, "transport error"),
            Event::InvalidAuth => {
                error!("invalid credentials, stopping event loop");
                return LoopAction::Stop;
            }
            Event::Other(kind) => debug!(%kind, "ignoring event"),
        }
        LoopAction::Continue
    }

    async fn handle_message(&self, message: MessageEvent) {
        for paper in self.resolve_all(&message.text).await {
            let summary = format_plain(&paper);
            if let Err(err) = self.outbound.send_text(&message.channel, &summary).await {
                warn!(%err, channel = %message.channel, "failed to send summary");
                continue;
            }
            // The destination is enqueued only once its summary went out,
            // so queue order tracks send order, not receipt order.
            self.queue.push_back(message.channel.clone()).await;
        }

        let mentioned =
            !self.bot.user_id.is_empty() && message.text.contains(&self.bot.user_id);
        if message.channel.starts_with('D') || mentioned {
            self.handle_translate_request(&message).await;
        }
    }

    async fn handle_translate_request(&self, message: &MessageEvent) {
        let mention = format!("<@{}>", self.bot.user_id);
        let text = message.text.replacen(&mention, "", 1);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let (from, to) = translation_direction(text);
        match self.translator.translate(from, to, text).await {
            Ok(translated) => {
                if let Err(err) = self.outbound.send_text(&message.channel, &translated).await {
                    warn!(%err, channel = %message.channel, "failed to send translation");
                }
            }
            Err(err) => warn!(%err, "translation failed"),
        }
    }

    async fn handle_ack(&self, ack: AckEvent) {
        if !ack.ok {
            warn!(reply_to = ack.reply_to, "outgoing message was rejected");
            return;
        }
        for paper in self.resolve_all(&ack.text).await {
            let Some(channel) = self.queue.pop_front().await else {
                // Sequencing invariant broken: more results than pushed
                // destinations. Drop the item rather than guess a channel.
                error!(id = %paper.id, "destination queue empty during ack delivery");
                debug_assert!(false, "destination queue empty during ack delivery");
                continue;
            };
            let abst_ja = if paper.abst_text.is_empty() {
                String::new()
            } else {
                match self.translator.translate("en", "ja", &paper.abst_text).await {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%err, id = %paper.id, "abstract translation failed");
                        String::new()
                    }
                }
            };
            let message = self.attachment_for(&paper, abst_ja, &ack.ts);
            if let Err(err) = self.outbound.post_attachment(&channel, &message).await {
                warn!(%err, channel = %channel, "failed to post attachment");
            }
        }
    }

    /// Resolve every extractable URL in `text`, skipping failures.
    async fn resolve_all(&self, text: &str) -> Vec<Paper> {
        let mut papers = Vec::new();
        for url in urls::extract_urls(text) {
            match self.resolver.resolve(&url).await {
                Ok(paper) => papers.push(paper),
                Err(Error::UnsupportedSource(_)) => debug!(%url, "not a paper URL"),
                Err(err) => info!(%err, %url, "skipping URL"),
            }
        }
        papers
    }

    fn attachment_for(&self, paper: &Paper, abst_ja: String, thread_ts: &str) -> AttachmentMessage {
        AttachmentMessage {
            attachment: Attachment {
                color: paper.source.color().to_string(),
                author_name: join_authors(&paper.authors),
                title: paper.title.clone(),
                title_link: paper.abst_url.clone(),
                text: paper.comment.clone(),
                fields: vec![
                    AttachmentField {
                        title: "Abstract".to_string(),
                        value: paper.abst_text.clone(),
                        short: false,
                    },
                    AttachmentField {
                        title: "概要".to_string(),
                        value: abst_ja,
                        short: false,
                    },
                ],
            },
            thread_ts: thread_ts.to_string(),
            username: self.bot.username.clone(),
            icon_url: self.bot.icon_url.clone(),
        }
    }

    /// Announce resolved trending papers to `channel`, score first.
    ///
    /// Mirrors the plain-message path, including the queue push per post,
    /// so ordering stays consistent should acks ever enrich these too.
    pub async fn announce_trending(&self, channel: &str, entries: &[TrendingPaper]) {
        for entry in entries {
            let paper = match self.resolver.resolve_arxiv_id(&entry.id).await {
                Ok(paper) => paper,
                Err(err) => {
                    info!(%err, id = %entry.id, "skipping trending paper");
                    continue;
                }
            };
            let text = format!("[{} tweets] {}", entry.tweet_count, format_plain(&paper));
            if let Err(err) = self.outbound.send_text(channel, &text).await {
                warn!(%err, channel = %channel, "failed to announce trending paper");
                continue;
            }
            self.queue.push_back(channel.to_string()).await;
        }
    }
}

/// One-line summary: `{authors}. <{abst_url} |{title}>. {year}`.
pub fn format_plain(paper: &Paper) -> String {
    format!(
        "{}. <{} |{}>. {}",
        join_authors(&paper.authors),
        paper.abst_url,
        paper.title,
        paper.year
    )
}

pub fn join_authors(authors: &[String]) -> String {
    authors.join(", ")
}

/// Pick a translation direction from the dominant language of `text`.
///
/// Japanese goes to English, English goes to Japanese, anything else is
/// auto-detected by the backend and rendered in Japanese.
pub fn translation_direction(text: &str) -> (&'static str, &'static str) {
    match whatlang::detect(text).map(|info| info.lang()) {
        Some(whatlang::Lang::Jpn) => ("ja", "en"),
        Some(whatlang::Lang::Eng) => ("en", "ja"),
        _ => ("auto", "ja"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{PageFetcher, Source};
    use crate::translate::Translator;
    use crate::Result;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Outbound double that records everything it is asked to post.
    #[derive(Clone, Default)]
    struct RecordingOutbound {
        texts: Arc<Mutex<Vec<(String, String)>>>,
        attachments: Arc<Mutex<Vec<(String, AttachmentMessage)>>>,
    }

    #[async_trait]
    impl Outbound for RecordingOutbound {
        async fn send_text(&self, channel: &str, text: &str) -> Result<()> {
            self.texts.lock().await.push((channel.to_string(), text.to_string()));
            Ok(())
        }

        async fn post_attachment(&self, channel: &str, message: &AttachmentMessage) -> Result<()> {
            self.attachments.lock().await.push((channel.to_string(), message.clone()));
            Ok(())
        }
    }

    fn dispatcher(
        outbound: RecordingOutbound,
        queue: DestinationQueue,
    ) -> Dispatcher<RecordingOutbound> {
        Dispatcher::new(
            outbound,
            Resolver::new().expect("resolver"),
            Translator::new().expect("translator"),
            queue,
            BotIdentity {
                user_id: "UBOT123".to_string(),
                username: "paperbot".to_string(),
                icon_url: String::new(),
            },
        )
    }

    /// Fetcher double that serves the bundled abs page for one known URL.
    struct FixtureFetcher;

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            if url == "https://arxiv.org/abs/1805.09547" {
                Ok(include_str!("../tests/fixtures/arxiv_abs.html").to_string())
            } else {
                Err(Error::FetchStatus { url: url.to_string(), status: 404 })
            }
        }
    }

    /// Translator double that tags the target language onto the input.
    struct StubTranslator;

    #[async_trait]
    impl Translate for StubTranslator {
        async fn translate(&self, _from: &str, to: &str, text: &str) -> Result<String> {
            Ok(format!("[{to}] {text}"))
        }
    }

    fn fixture_dispatcher(
        outbound: RecordingOutbound,
        queue: DestinationQueue,
    ) -> Dispatcher<RecordingOutbound> {
        Dispatcher::new(
            outbound,
            Resolver::with_fetcher(FixtureFetcher),
            StubTranslator,
            queue,
            BotIdentity {
                user_id: "UBOT123".to_string(),
                username: "paperbot".to_string(),
                icon_url: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn resolved_message_sends_summary_and_enqueues_destination() {
        let outbound = RecordingOutbound::default();
        let queue = DestinationQueue::new();
        let dispatcher = fixture_dispatcher(outbound.clone(), queue.clone());

        dispatcher
            .handle_event(Event::Message(MessageEvent {
                channel: "C123".to_string(),
                text: "great read https://arxiv.org/abs/1805.09547 \
                       and broken https://arxiv.org/abs/9999.99999"
                    .to_string(),
                ..MessageEvent::default()
            }))
            .await;

        let texts = outbound.texts.lock().await;
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].0, "C123");
        assert!(
            texts[0].1.starts_with("Ryo Takahashi, Ran Tian, Kentaro Inui."),
            "unexpected summary: {}",
            texts[0].1
        );
        drop(texts);
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn ack_delivers_attachment_to_queued_destination() {
        let outbound = RecordingOutbound::default();
        let queue = DestinationQueue::new();
        let dispatcher = fixture_dispatcher(outbound.clone(), queue.clone());

        dispatcher
            .handle_event(Event::Message(MessageEvent {
                channel: "C123".to_string(),
                text: "see https://arxiv.org/abs/1805.09547".to_string(),
                ..MessageEvent::default()
            }))
            .await;

        let summary = outbound.texts.lock().await[0].1.clone();
        dispatcher
            .handle_event(Event::Ack(AckEvent {
                ok: true,
                reply_to: 1,
                text: summary,
                ts: "1600000000.000100".to_string(),
            }))
            .await;

        assert!(queue.is_empty().await);
        let attachments = outbound.attachments.lock().await;
        assert_eq!(attachments.len(), 1);
        let (channel, message) = &attachments[0];
        assert_eq!(channel, "C123");
        assert_eq!(message.thread_ts, "1600000000.000100");
        assert_eq!(message.attachment.color, "#b31b1b");
        assert_eq!(message.attachment.title_link, "https://arxiv.org/abs/1805.09547");
        assert_eq!(message.attachment.author_name, "Ryo Takahashi, Ran Tian, Kentaro Inui");
        assert_eq!(message.attachment.fields[0].title, "Abstract");
        assert!(message.attachment.fields[0].value.starts_with("Embedding models"));
        assert_eq!(message.attachment.fields[1].title, "概要");
        assert!(message.attachment.fields[1].value.starts_with("[ja] Embedding models"));
    }

    #[tokio::test]
    async fn acks_deliver_in_send_order() {
        let outbound = RecordingOutbound::default();
        let queue = DestinationQueue::new();
        let dispatcher = fixture_dispatcher(outbound.clone(), queue.clone());

        for channel in ["C1", "C2"] {
            dispatcher
                .handle_event(Event::Message(MessageEvent {
                    channel: channel.to_string(),
                    text: "see https://arxiv.org/abs/1805.09547".to_string(),
                    ..MessageEvent::default()
                }))
                .await;
        }
        let summary = outbound.texts.lock().await[0].1.clone();
        for reply_to in [1, 2] {
            dispatcher
                .handle_event(Event::Ack(AckEvent {
                    ok: true,
                    reply_to,
                    text: summary.clone(),
                    ts: format!("160000000{reply_to}.000000"),
                }))
                .await;
        }

        let attachments = outbound.attachments.lock().await;
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].0, "C1");
        assert_eq!(attachments[1].0, "C2");
        assert!(queue.is_empty().await);
    }

    #[cfg(debug_assertions)]
    #[tokio::test]
    #[should_panic(expected = "destination queue empty during ack delivery")]
    async fn ack_on_empty_queue_panics_in_debug_builds() {
        let dispatcher =
            fixture_dispatcher(RecordingOutbound::default(), DestinationQueue::new());
        dispatcher
            .handle_event(Event::Ack(AckEvent {
                ok: true,
                reply_to: 1,
                text: "stray <https://arxiv.org/abs/1805.09547 |Autoencoder>".to_string(),
                ts: "1600000000.000100".to_string(),
            }))
            .await;
    }

    #[tokio::test]
    async fn message_without_urls_produces_no_output() {
        let outbound = RecordingOutbound::default();
        let queue = DestinationQueue::new();
        let dispatcher = dispatcher(outbound.clone(), queue.clone());

        let action = dispatcher
            .handle_event(Event::Message(MessageEvent {
                channel: "C123".to_string(),
                text: "just chatting, nothing to see".to_string(),
                ..MessageEvent::default()
            }))
            .await;

        assert_eq!(action, LoopAction::Continue);
        assert!(outbound.texts.lock().await.is_empty());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn unsupported_urls_are_silently_skipped() {
        let outbound = RecordingOutbound::default();
        let queue = DestinationQueue::new();
        let dispatcher = dispatcher(outbound.clone(), queue.clone());

        dispatcher
            .handle_event(Event::Message(MessageEvent {
                channel: "C123".to_string(),
                text: "look at https://example.com/not-a-paper.pdf".to_string(),
                ..MessageEvent::default()
            }))
            .await;

        assert!(outbound.texts.lock().await.is_empty());
        assert!(outbound.attachments.lock().await.is_empty());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn lifecycle_events_do_not_stop_the_loop() {
        let dispatcher = dispatcher(RecordingOutbound::default(), DestinationQueue::new());
        assert_eq!(dispatcher.handle_event(Event::Connected).await, LoopAction::Continue);
        assert_eq!(
            dispatcher
                .handle_event(Event::PresenceChange { user: "U1".to_string() })
                .await,
            LoopAction::Continue
        );
        assert_eq!(
            dispatcher
                .handle_event(Event::TransportError { code: 2, msg: "hiccup".to_string() })
                .await,
            LoopAction::Continue
        );
    }

    #[tokio::test]
    async fn invalid_auth_stops_the_loop() {
        let dispatcher = dispatcher(RecordingOutbound::default(), DestinationQueue::new());
        assert_eq!(dispatcher.handle_event(Event::InvalidAuth).await, LoopAction::Stop);
    }

    #[test]
    fn plain_summary_format() {
        let paper = Paper {
            id: "1805.09547".to_string(),
            title: "Autoencoder".to_string(),
            authors: vec!["Ryo Takahashi".to_string(), "Ran Tian".to_string()],
            year: 2018,
            abst_url: "https://arxiv.org/abs/1805.09547".to_string(),
            source: Source::Arxiv,
            ..Paper::default()
        };
        assert_eq!(
            format_plain(&paper),
            "Ryo Takahashi, Ran Tian. <https://arxiv.org/abs/1805.09547 |Autoencoder>. 2018"
        );
    }

    #[test]
    fn authors_join_with_comma_and_space() {
        assert_eq!(join_authors(&[]), "");
        assert_eq!(join_authors(&["One".to_string()]), "One");
        assert_eq!(join_authors(&["One".to_string(), "Two".to_string()]), "One, Two");
    }

    #[test]
    fn translation_direction_by_language() {
        assert_eq!(
            translation_direction("今日はとても良い天気ですね。散歩に行きましょう。"),
            ("ja", "en")
        );
        assert_eq!(
            translation_direction("The weather is wonderful today and we should go for a walk."),
            ("en", "ja")
        );
        assert_eq!(translation_direction("12345 67890"), ("auto", "ja"));
    }
}
