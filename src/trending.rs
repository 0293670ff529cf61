//! Daily trending-papers scrape
//!
//! The ranking page lists paper ids in `.apaper` elements and tweet counts
//! in `.tweetcount` elements as two parallel lists; they are paired
//! positionally and truncated to the shorter list when the counts mismatch.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveTime};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::{Error, Result};

/// Default ranking page (arxiv-sanity's "top recent tweets" view).
pub const TREND_PAGE_URL: &str = "http://www.arxiv-sanity.com/toptwtr";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(25);

static PAPER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".apaper").expect("valid selector"));
static COUNT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".tweetcount").expect("valid selector"));

/// One ranked entry scraped from the trending page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendingPaper {
    pub id: String,
    pub tweet_count: i64,
}

/// Scraper for the external ranking page.
pub struct TrendSource {
    client: reqwest::Client,
    url: String,
}

impl TrendSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, url: url.into() })
    }

    /// Fetch the ranking page and extract the day's trending papers.
    pub async fn fetch_trending(&self) -> Result<Vec<TrendingPaper>> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::FetchStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        Ok(parse_trending(&body))
    }
}

/// Pair `.apaper` ids with `.tweetcount` scores positionally.
pub fn parse_trending(body: &str) -> Vec<TrendingPaper> {
    let doc = Html::parse_document(body);

    let ids: Vec<String> = doc
        .select(&PAPER_SEL)
        .map(|element| element.value().attr("id").unwrap_or_default().to_string())
        .collect();

    let counts: Vec<i64> = doc
        .select(&COUNT_SEL)
        .map(|element| {
            let text = element.text().collect::<String>();
            text.split_whitespace()
                .next()
                .and_then(|token| token.parse().ok())
                .unwrap_or(0)
        })
        .collect();

    // zip truncates to the shorter list
    ids.into_iter()
        .zip(counts)
        .map(|(id, tweet_count)| TrendingPaper { id, tweet_count })
        .collect()
}

/// Wall-clock wait until the next local occurrence of `at`.
pub fn until_next_occurrence(now: DateTime<Local>, at: NaiveTime) -> Duration {
    let now_local = now.naive_local();
    let candidate = now_local.date().and_time(at);
    let next = if candidate > now_local {
        candidate
    } else {
        candidate + chrono::Duration::days(1)
    };
    (next - now_local).to_std().unwrap_or_default()
}
