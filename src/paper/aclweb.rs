//! ACL Anthology extraction
//!
//! Everything of interest is in citation meta tags; the abstract is never
//! published on the paper page, so records from this source stay partial.
//! The venue is derived from the anthology id's single-letter prefix.

use once_cell::sync::Lazy;
use scraper::Selector;

use super::{meta_content, meta_contents, Paper, Source};

static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="citation_title"]"#).expect("valid selector"));
static AUTHOR_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="citation_author"]"#).expect("valid selector"));
static JOURNAL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="citation_journal_title"]"#).expect("valid selector"));
static PUB_DATE_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="citation_publication_date"]"#).expect("valid selector")
});

/// Normalize any anthology URL shape to the canonical uppercase id.
///
/// `https://aclanthology.info/papers/P18-1200/p18-1200`,
/// `http://aclweb.org/anthology/P18-1200.pdf` and the `.bib` form all
/// yield `P18-1200`.
pub fn id_from_url(raw_url: &str) -> String {
    let last = raw_url.rsplit('/').next().unwrap_or(raw_url);
    let id = last.split(".pdf").next().unwrap_or(last);
    let id = id.split(".bib").next().unwrap_or(id);
    id.to_ascii_uppercase()
}

/// Fresh record with the id and this source's fixed URL templates filled in.
pub fn skeleton(id: &str) -> Paper {
    Paper {
        id: id.to_string(),
        abst_url: format!("https://aclanthology.info/papers/{}/{}", id, id.to_ascii_lowercase()),
        pdf_url: format!("http://aclweb.org/anthology/{id}"),
        bib_url: format!("http://aclweb.org/anthology/{id}.bib"),
        source: Source::AclAnthology,
        ..Paper::default()
    }
}

/// Populate `paper` from the fetched paper page body.
pub fn fill_from_abs_page(paper: &mut Paper, body: &str) {
    let doc = scraper::Html::parse_document(body);

    paper.title = meta_content(&doc, &TITLE_SEL);
    paper.authors = meta_contents(&doc, &AUTHOR_SEL);
    paper.volume = meta_content(&doc, &JOURNAL_SEL);
    paper.venue = venue_from_prefix(paper.id.get(..1).unwrap_or("")).to_string();
    paper.year = meta_content(&doc, &PUB_DATE_SEL).parse().unwrap_or(0);
}

/// Venue code for an anthology id's single-letter prefix.
/// Unknown prefixes map to the empty string.
pub fn venue_from_prefix(prefix: &str) -> &'static str {
    match prefix {
        "J" => "CL",
        "Q" => "TACL",
        "P" => "ACL",
        "E" => "EACL",
        "N" => "NAACL",
        "S" => "SEMEVAL",
        "D" => "EMNLP",
        "K" => "CONLL",
        _ => "",
    }
}
