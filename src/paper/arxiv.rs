//! arXiv abstract-page extraction
//!
//! The abs page carries the title and date in citation meta tags; authors,
//! abstract and the free-text comment live in labeled body regions.

use once_cell::sync::Lazy;
use scraper::Selector;

use super::{collapse_newlines, element_text, meta_content, year_of, Paper, Source};

static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="citation_title"]"#).expect("valid selector"));
static DATE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="citation_date"]"#).expect("valid selector"));
static AUTHORS_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".authors").expect("valid selector"));
static ABSTRACT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".abstract").expect("valid selector"));
static COMMENTS_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".comments").expect("valid selector"));

/// Normalize any arXiv URL shape to the bare paper id.
///
/// `https://arxiv.org/abs/1811.01458v1` and
/// `https://arxiv.org/pdf/1811.01458v1.pdf` both yield `1811.01458v1`.
pub fn id_from_url(raw_url: &str) -> String {
    let last = raw_url.rsplit('/').next().unwrap_or(raw_url);
    last.split(".pdf").next().unwrap_or(last).to_string()
}

/// Fresh record with the id and this source's fixed URL templates filled in.
pub fn skeleton(id: &str) -> Paper {
    Paper {
        id: id.to_string(),
        abst_url: format!("https://arxiv.org/abs/{id}"),
        pdf_url: format!("https://arxiv.org/pdf/{id}.pdf"),
        html_url: format!("https://www.arxiv-vanity.com/papers/{id}/"),
        source: Source::Arxiv,
        ..Paper::default()
    }
}

/// Populate `paper` from the fetched abs page body.
///
/// Missing regions leave their fields at the skeleton defaults.
pub fn fill_from_abs_page(paper: &mut Paper, body: &str) {
    let doc = scraper::Html::parse_document(body);

    paper.title = meta_content(&doc, &TITLE_SEL);

    let author_line = element_text(&doc, &AUTHORS_SEL).replacen("Authors:", "", 1);
    paper.authors = author_line
        .split(',')
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty())
        .collect();

    paper.year = year_of(&meta_content(&doc, &DATE_SEL));

    let abstract_text = element_text(&doc, &ABSTRACT_SEL).replacen("Abstract:", "", 1);
    paper.abst_text = collapse_newlines(&abstract_text);

    paper.comment = collapse_newlines(&element_text(&doc, &COMMENTS_SEL));
}
