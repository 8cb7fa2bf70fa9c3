// src/content/html.rs
// =============================================================================
// This module turns a fetched page into a PageResult.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser), so broken markup still
//   parses into *something*
//
// Steps:
// 1. Decode the bytes (best effort, see decode.rs)
// 2. Fingerprint the raw bytes
// 3. Grab the first <title>
// 4. Collect every <a href>, resolve + normalize it, and mark it internal or
//    external relative to the page
// =============================================================================

use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::debug;

use super::decode::decode_body;
use super::fingerprint::Fingerprint;
use crate::normalize::{is_same_origin, normalize, NormalizedUrl};

/// Title recorded for pages without a usable <title>
pub const UNTITLED: &str = "Untitled";

/// A link found on a page, already normalized.
///
/// Ordered by URL so a BTreeSet of them iterates deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiscoveredLink {
    pub url: NormalizedUrl,
    pub is_external: bool,
}

/// Everything the crawler keeps from one page.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub title: String,
    pub fingerprint: Fingerprint,
    pub links: BTreeSet<DiscoveredLink>,
    /// The body needed lossy decoding; title and links are best effort
    pub degraded: bool,
}

fn title_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    // Constant selector, known to be valid
    SELECTOR.get_or_init(|| Selector::parse("title").unwrap())
}

fn anchor_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("a[href]").unwrap())
}

// Processes one fetched page
//
// Parameters:
//   source_url: the page's URL, used to resolve relative links and to decide
//               which links are external
//   body: raw response bytes
//   content_type: the Content-Type header, if the server sent one
//
// Example:
//   source_url = "https://example.com/"
//   body = "<a href='/about'>About</a><a href='https://other.example/x'>X</a>"
//   links = {https://example.com/about (internal), https://other.example/x (external)}
pub fn process(source_url: &NormalizedUrl, body: &[u8], content_type: Option<&str>) -> PageResult {
    let fingerprint = Fingerprint::of(body);
    let decoded = decode_body(body, content_type);

    let document = Html::parse_document(&decoded.text);
    let title = extract_title(&document);
    let links = extract_links(&document, source_url);

    debug!(
        url = %source_url,
        links = links.len(),
        degraded = decoded.lossy,
        "processed page"
    );

    PageResult {
        title,
        fingerprint,
        links,
        degraded: decoded.lossy,
    }
}

// First <title> element, whitespace collapsed. Falls back to UNTITLED.
fn extract_title(document: &Html) -> String {
    document
        .select(title_selector())
        .next()
        .map(|element| {
            element
                .text()
                .flat_map(str::split_whitespace)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn extract_links(document: &Html, source_url: &NormalizedUrl) -> BTreeSet<DiscoveredLink> {
    let mut links = BTreeSet::new();

    for element in document.select(anchor_selector()) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        // "#section" only points back into this page
        if href.trim_start().starts_with('#') {
            continue;
        }

        // mailto:, javascript:, tel:, garbage -> None
        let Some(url) = normalize(href, Some(source_url.as_url())) else {
            continue;
        };

        let is_external = !is_same_origin(&url, source_url);
        links.insert(DiscoveredLink { url, is_external });
    }

    links
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why BTreeSet instead of Vec?
//    - A page often links to the same URL many times (nav bars, footers)
//    - A set keeps each normalized link once
//    - BTreeSet (unlike HashSet) iterates in sorted order, which makes logs
//      and tests stable
//
// 2. What is OnceLock?
//    - A cell that is initialized exactly once, on first use
//    - Parsing a CSS selector is not free, so we parse it once and reuse it
//      for every page instead of on every call
//
// 3. What does `let ... else` do?
//    - `let Some(x) = expr else { continue; };` binds x if the pattern matches
//    - Otherwise it runs the else block, which must leave the scope
//      (continue, return, break)
//    - It keeps the happy path un-indented
// -----------------------------------------------------------------------------
