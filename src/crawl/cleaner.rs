//! Regex-based HTML cleanup.
//!
//! Not a parser: comments and a handful of non-content elements are dropped,
//! `<a href>` links are collected, then every remaining tag and entity is
//! removed. Good enough for indexing visible text.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Elements whose content never counts as page text
const BLOCK_ELEMENTS: &[&str] = &["head", "style", "script", "noscript", "svg"];

static COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));

static ELEMENTS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BLOCK_ELEMENTS
        .iter()
        .map(|name| {
            Regex::new(&format!(r"(?is)<{name}\b.*?>.*?</{name}.*?>"))
                .expect("valid element pattern")
        })
        .collect()
});

static LINKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s+(?:[^>]*?\s+)?href\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid link pattern")
});

static TAGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<.*?>").expect("valid tag pattern"));

static ENTITIES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&\S*?;").expect("valid entity pattern"));

/// Visible text and outgoing links of one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedPage {
    pub text: String,
    /// Absolute http(s) links in document order, fragments removed
    pub links: Vec<Url>,
}

pub struct HtmlCleaner;

impl HtmlCleaner {
    /// Split `html` fetched from `base` into text and links.
    pub fn clean(base: &Url, html: &str) -> CleanedPage {
        let html = strip_block_elements(html);
        let links = list_links(base, &html);
        let text = strip_entities(&strip_tags(&html));
        CleanedPage { text, links }
    }
}

/// Replace comments and non-content elements with a space.
pub fn strip_block_elements(html: &str) -> String {
    let mut html = COMMENTS.replace_all(html, " ").into_owned();
    for element in ELEMENTS.iter() {
        html = element.replace_all(&html, " ").into_owned();
    }
    html
}

pub fn strip_tags(html: &str) -> String {
    TAGS.replace_all(html, "").into_owned()
}

pub fn strip_entities(html: &str) -> String {
    ENTITIES.replace_all(html, "").into_owned()
}

/// `href` targets of anchor tags, resolved against `base`.
///
/// Unparseable and non-http(s) targets are skipped.
pub fn list_links(base: &Url, html: &str) -> Vec<Url> {
    LINKS
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .filter_map(|href| base.join(href.as_str()).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .collect()
}
