//! Paper records, source-site classification and metadata resolution
//!
//! Each known source site bundles its own id-normalization rule, URL
//! templates and page-extraction routine behind the [`Source`] enum, so a
//! URL is classified once and everything downstream is determined by the
//! variant.

pub mod aclweb;
pub mod arxiv;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use scraper::{Html, Selector};
use url::Url;

use crate::{Error, Result};

const USER_AGENT: &str = "paperbot/0.1.0";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

/// Bibliographic record extracted from a paper-hosting site.
///
/// Built fresh per resolution, immutable afterwards, never persisted.
/// Fields the source page does not provide stay at their defaults; a
/// partial record is expected (ACL Anthology never carries an abstract).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub volume: String,
    pub venue: String,
    pub year: i32,
    pub pdf_url: String,
    pub html_url: String,
    pub abst_text: String,
    pub abst_url: String,
    pub bib_text: String,
    pub bib_url: String,
    pub comment: String,
    pub source: Source,
}

/// A paper-hosting site the resolver knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Source {
    #[default]
    Arxiv,
    AclAnthology,
    OpenReview,
}

impl Source {
    /// Classify a URL's host into a known source site.
    ///
    /// Scheme-less URLs are accepted; a leading `www.` is ignored.
    /// Unknown hosts yield `None` and the caller skips the URL silently.
    pub fn detect(raw_url: &str) -> Option<Source> {
        let host = host_of(raw_url)?;
        match host.as_str() {
            "arxiv.org" => Some(Source::Arxiv),
            "aclweb.org" | "aclanthology.info" | "aclanthology.coli.uni-saarland.de" => {
                Some(Source::AclAnthology)
            }
            "openreview.net" => Some(Source::OpenReview),
            _ => None,
        }
    }

    /// Attachment accent color for this source.
    pub fn color(&self) -> &'static str {
        match self {
            Source::Arxiv => "#b31b1b",
            Source::AclAnthology => "#cc0000",
            Source::OpenReview => "#8c1b13",
        }
    }
}

fn host_of(raw_url: &str) -> Option<String> {
    let candidate = if raw_url.contains("://") {
        raw_url.to_string()
    } else {
        format!("https://{raw_url}")
    };
    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

/// Page-fetch capability the resolver reads abstract pages through.
///
/// Production uses [`HttpFetcher`]; tests resolve against canned pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Body of the page at `url`, or an error for non-2xx/transport failures.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Production [`PageFetcher`] with connect/read timeouts.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

/// Fetches abstract pages and builds [`Paper`] records.
pub struct Resolver {
    fetcher: Box<dyn PageFetcher>,
}

impl Resolver {
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(HttpFetcher::new()?))
    }

    /// Resolver over any page-fetch capability.
    pub fn with_fetcher(fetcher: impl PageFetcher + 'static) -> Self {
        Self { fetcher: Box::new(fetcher) }
    }

    /// Resolve any supported paper URL to a full record.
    ///
    /// Unknown hosts return [`Error::UnsupportedSource`] without touching
    /// the network. OpenReview is recognized but has no extractor and
    /// deterministically returns [`Error::NotImplemented`].
    pub async fn resolve(&self, raw_url: &str) -> Result<Paper> {
        match Source::detect(raw_url) {
            Some(Source::Arxiv) => self.resolve_arxiv_id(&arxiv::id_from_url(raw_url)).await,
            Some(Source::AclAnthology) => {
                let mut paper = aclweb::skeleton(&aclweb::id_from_url(raw_url));
                let body = self.fetcher.fetch(&paper.abst_url).await?;
                aclweb::fill_from_abs_page(&mut paper, &body);
                Ok(paper)
            }
            Some(Source::OpenReview) => Err(Error::NotImplemented("openreview.net")),
            None => Err(Error::UnsupportedSource(raw_url.to_string())),
        }
    }

    /// Resolve an arXiv paper directly by id, as the trend job does.
    pub async fn resolve_arxiv_id(&self, id: &str) -> Result<Paper> {
        let mut paper = arxiv::skeleton(id);
        let body = self.fetcher.fetch(&paper.abst_url).await?;
        arxiv::fill_from_abs_page(&mut paper, &body);
        Ok(paper)
    }
}

/// First `content` attribute matching `selector`, or empty.
pub(crate) fn meta_content(doc: &Html, selector: &Selector) -> String {
    doc.select(selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .unwrap_or_default()
        .to_string()
}

/// All `content` attributes matching `selector`, in document order.
pub(crate) fn meta_contents(doc: &Html, selector: &Selector) -> Vec<String> {
    doc.select(selector)
        .filter_map(|element| element.value().attr("content"))
        .map(str::to_string)
        .collect()
}

/// Concatenated text of the first element matching `selector`, or empty.
pub(crate) fn element_text(doc: &Html, selector: &Selector) -> String {
    doc.select(selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .unwrap_or_default()
}

/// Embedded newlines become spaces; surrounding whitespace is dropped.
pub(crate) fn collapse_newlines(text: &str) -> String {
    text.replace('\n', " ").trim().to_string()
}

/// Lenient year extraction from a page date string. 0 when unparseable,
/// matching the partial-record policy.
pub(crate) fn year_of(date: &str) -> i32 {
    for format in ["%Y/%m/%d", "%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, format) {
            return parsed.year();
        }
    }
    date.get(..4).and_then(|prefix| prefix.parse().ok()).unwrap_or(0)
}
